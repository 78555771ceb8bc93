//! Tagged records for trace instructions, CFG shape, and analysis output.
//!
//! These mirror the NDJSON wire format one-for-one: field names match the
//! JSON keys (`fn` excepted, since it is a Rust keyword), and optional JSON
//! fields are `Option`/default-empty `Vec`.

use serde::{Deserialize, Serialize};

/// A transmitter tag on a trace instruction: the attacker observes operand
/// `uses[which]`, so its value must agree across both symbolic runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    pub kind: String,
    pub which: usize,
}

/// One instruction record from the trace stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceInst {
    #[serde(rename = "fn")]
    pub function: String,
    pub bb: String,
    pub pp: String,
    pub op: String,
    #[serde(rename = "def", default, skip_serializing_if = "Option::is_none")]
    pub def_id: Option<String>,
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def_ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_tys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_pred: Option<String>,
}

/// A trace-index record: maps a program point back to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceIndex {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub bb: String,
    pub pp: String,
    pub op: String,
    #[serde(rename = "def", default, skip_serializing_if = "Option::is_none")]
    pub def_id: Option<String>,
    pub line: u64,
}

/// Per-function aggregate counters emitted alongside a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncSummary {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub inst_count: u64,
    #[serde(default)]
    pub bb_count: u64,
    #[serde(default)]
    pub tx_count: u64,
    #[serde(default)]
    pub trace_emitted: u64,
    #[serde(default)]
    pub trace_truncated: bool,
    #[serde(default)]
    pub trace_max_inst: u64,
}

/// A basic block in the CFG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgBlock {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub bb: String,
    #[serde(default)]
    pub succs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_pp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// An edge in the CFG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgEdge {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(rename = "from")]
    pub from_bb: String,
    #[serde(rename = "to")]
    pub to_bb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_pp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sense: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(rename = "default", default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// One branch decision within a recorded path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDecision {
    pub pp: String,
    pub kind: String,
    pub succ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sense: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(rename = "default", default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A single enumerated feasible path through a function's CFG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgPath {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<i64>,
    #[serde(default)]
    pub bbs: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<PathDecision>,
    #[serde(default)]
    pub path_cond: Vec<String>,
    #[serde(default)]
    pub path_cond_json: Vec<serde_json::Value>,
    #[serde(default)]
    pub pp_seq: Vec<String>,
}

/// Per-function path enumeration statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSummary {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub paths_emitted: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_loop_iters: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_depth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_loop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_pruned_br: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_pruned_switch: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_pruned_indirect: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_calls: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_leaves: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_prune_max_paths: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_prune_max_depth: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_prune_loop: Option<u64>,
}

/// Coverage of a program point by enumerated paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpCoverage {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub pp: String,
    #[serde(default)]
    pub path_count: u64,
    #[serde(default)]
    pub path_ids: Vec<i64>,
    #[serde(default)]
    pub truncated: bool,
}

/// Publicness verdict for one defined value on one path. `public` is
/// `None` to represent the wire value `null` ("unknown").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPublicness {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub path_id: i64,
    pub pp: String,
    pub value: String,
    pub public: Option<bool>,
}

impl PathPublicness {
    pub fn new(
        function: impl Into<String>,
        path_id: i64,
        pp: impl Into<String>,
        value: impl Into<String>,
        public: Option<bool>,
    ) -> Self {
        PathPublicness {
            kind: "path_publicness".to_string(),
            function: function.into(),
            path_id,
            pp: pp.into(),
            value: value.into(),
            public,
        }
    }
}

/// Aggregated publicness verdict for one value at one program point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAtPoint {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub pp: String,
    pub value: String,
    pub public: Option<bool>,
    pub total_paths: u64,
    pub missing_paths: u64,
    pub truncated: bool,
}

/// How an aggregate should resolve when a point's verdict is under-determined
/// (missing per-path records, or coverage reported truncation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    Unknown,
    Public,
    Secret,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        MissingPolicy::Unknown
    }
}

/// Per-path solver/query statistics, for benchmarking and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAnalysisSummary {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub path_id: i64,
    pub inst_count: u64,
    pub def_count: u64,
    pub query_count: u64,
    pub sat_count: u64,
    pub unsat_count: u64,
    pub unknown_count: u64,
    pub solver_time_ms: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl PathAnalysisSummary {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        function: impl Into<String>,
        path_id: i64,
        inst_count: u64,
        def_count: u64,
        query_count: u64,
        sat_count: u64,
        unsat_count: u64,
        unknown_count: u64,
        solver_time_ms: f64,
        cache_hits: u64,
        cache_misses: u64,
    ) -> Self {
        PathAnalysisSummary {
            kind: "path_analysis_summary".to_string(),
            function: function.into(),
            path_id,
            inst_count,
            def_count,
            query_count,
            sat_count,
            unsat_count,
            unknown_count,
            solver_time_ms,
            cache_hits,
            cache_misses,
        }
    }
}

impl PublicAtPoint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        function: impl Into<String>,
        pp: impl Into<String>,
        value: impl Into<String>,
        public: Option<bool>,
        total_paths: u64,
        missing_paths: u64,
        truncated: bool,
    ) -> Self {
        PublicAtPoint {
            kind: "public_at_point".to_string(),
            function: function.into(),
            pp: pp.into(),
            value: value.into(),
            public,
            total_paths,
            missing_paths,
            truncated,
        }
    }
}

/// Per-function roll-up of all its paths' [`PathAnalysisSummary`] records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAnalysisSummary {
    pub kind: String,
    #[serde(rename = "fn")]
    pub function: String,
    pub paths_analyzed: u64,
    pub inst_count: u64,
    pub def_count: u64,
    pub query_count: u64,
    pub sat_count: u64,
    pub unsat_count: u64,
    pub unknown_count: u64,
    pub solver_time_ms: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl FunctionAnalysisSummary {
    /// Folds one more path's summary into a running per-function total.
    pub fn accumulate(&mut self, path: &PathAnalysisSummary) {
        self.paths_analyzed += 1;
        self.inst_count += path.inst_count;
        self.def_count += path.def_count;
        self.query_count += path.query_count;
        self.sat_count += path.sat_count;
        self.unsat_count += path.unsat_count;
        self.unknown_count += path.unknown_count;
        self.solver_time_ms += path.solver_time_ms;
        self.cache_hits += path.cache_hits;
        self.cache_misses += path.cache_misses;
    }

    pub fn new(function: impl Into<String>) -> Self {
        FunctionAnalysisSummary {
            kind: "function_analysis_summary".to_string(),
            function: function.into(),
            paths_analyzed: 0,
            inst_count: 0,
            def_count: 0,
            query_count: 0,
            sat_count: 0,
            unsat_count: 0,
            unknown_count: 0,
            solver_time_ms: 0.0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }
}
