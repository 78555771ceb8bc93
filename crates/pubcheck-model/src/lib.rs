//! Record model, NDJSON ingest, and per-function join for program-trace
//! publicness analysis.
//!
//! This crate owns everything upstream of the symbolic engine: the typed
//! records that make up the trace/CFG wire format, readers that turn NDJSON
//! into those records, and the per-function join that hands the engine an
//! ordered instruction list per path.

pub mod error;
pub mod ingest;
pub mod join;
pub mod record;
pub mod token;

pub use error::IngestError;
pub use ingest::{
    load_cfg, load_func_summary, load_inputs, load_trace, load_trace_index, trace_by_fn,
    write_record, CfgBundle, Inputs,
};
pub use join::{build_pipeline, FunctionPipeline, PathBundle};
pub use record::{
    CfgBlock, CfgEdge, CfgPath, FuncSummary, FunctionAnalysisSummary, MissingPolicy,
    PathAnalysisSummary, PathDecision, PathPublicness, PathSummary, PpCoverage, PublicAtPoint,
    TraceIndex, TraceInst, TxInfo,
};
pub use token::{classify, label_value, sort_hint, type_width, SortHint, TokenKind, POINTER_WIDTH};
