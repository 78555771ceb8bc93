//! Per-function join of trace instructions with CFG paths.
//!
//! Purely functional: given a function's trace instructions and its
//! enumerated paths, produce the ordered instruction list each path will be
//! replayed against. No decisions are made here -- feasibility and path
//! conditions are the symbolic engine's job.

use std::collections::HashMap;

use crate::ingest::CfgBundle;
use crate::record::{CfgBlock, CfgEdge, CfgPath, PathSummary, PpCoverage, TraceInst};

/// A CFG path plus the instruction list it replays, in path order.
#[derive(Debug, Clone)]
pub struct PathBundle {
    pub path: CfgPath,
    pub insts: Vec<TraceInst>,
}

/// Everything the engine needs for one function.
#[derive(Debug, Clone, Default)]
pub struct FunctionPipeline {
    pub function: String,
    pub insts: Vec<TraceInst>,
    pub bb_insts: HashMap<String, Vec<TraceInst>>,
    pub blocks: Vec<CfgBlock>,
    pub edges: Vec<CfgEdge>,
    pub paths: Vec<PathBundle>,
    pub summaries: Vec<PathSummary>,
    pub pp_coverage: Vec<PpCoverage>,
}

/// Join trace instructions and CFG records into one [`FunctionPipeline`] per
/// function name appearing in either the trace or the CFG.
pub fn build_pipeline(trace: &[TraceInst], cfg: &CfgBundle) -> HashMap<String, FunctionPipeline> {
    let mut by_fn: HashMap<String, Vec<TraceInst>> = HashMap::new();
    for inst in trace {
        by_fn.entry(inst.function.clone()).or_default().push(inst.clone());
    }

    let mut blocks_by_fn: HashMap<String, Vec<CfgBlock>> = HashMap::new();
    for b in &cfg.blocks {
        blocks_by_fn.entry(b.function.clone()).or_default().push(b.clone());
    }
    let mut edges_by_fn: HashMap<String, Vec<CfgEdge>> = HashMap::new();
    for e in &cfg.edges {
        edges_by_fn.entry(e.function.clone()).or_default().push(e.clone());
    }
    let mut paths_by_fn: HashMap<String, Vec<CfgPath>> = HashMap::new();
    for p in &cfg.paths {
        paths_by_fn.entry(p.function.clone()).or_default().push(p.clone());
    }
    let mut summaries_by_fn: HashMap<String, Vec<PathSummary>> = HashMap::new();
    for s in &cfg.summaries {
        summaries_by_fn.entry(s.function.clone()).or_default().push(s.clone());
    }
    let mut pp_cov_by_fn: HashMap<String, Vec<PpCoverage>> = HashMap::new();
    for p in &cfg.pp_coverage {
        pp_cov_by_fn.entry(p.function.clone()).or_default().push(p.clone());
    }

    let mut fns: Vec<String> = Vec::new();
    for key in by_fn.keys().chain(blocks_by_fn.keys()).chain(paths_by_fn.keys()) {
        if !fns.contains(key) {
            fns.push(key.clone());
        }
    }

    let mut out = HashMap::new();
    for fn_name in fns {
        let insts = by_fn.get(&fn_name).cloned().unwrap_or_default();
        let mut bb_insts: HashMap<String, Vec<TraceInst>> = HashMap::new();
        for inst in &insts {
            bb_insts.entry(inst.bb.clone()).or_default().push(inst.clone());
        }
        let inst_by_pp: HashMap<&str, &TraceInst> =
            insts.iter().map(|inst| (inst.pp.as_str(), inst)).collect();

        let mut path_bundles = Vec::new();
        for p in paths_by_fn.get(&fn_name).cloned().unwrap_or_default() {
            let mut p_insts = Vec::new();
            if !p.pp_seq.is_empty() {
                for pp in &p.pp_seq {
                    if let Some(inst) = inst_by_pp.get(pp.as_str()) {
                        p_insts.push((*inst).clone());
                    }
                }
            } else {
                for bb in &p.bbs {
                    if let Some(bb_list) = bb_insts.get(bb) {
                        p_insts.extend(bb_list.iter().cloned());
                    }
                }
            }
            path_bundles.push(PathBundle { path: p, insts: p_insts });
        }

        out.insert(
            fn_name.clone(),
            FunctionPipeline {
                function: fn_name.clone(),
                insts,
                bb_insts,
                blocks: blocks_by_fn.get(&fn_name).cloned().unwrap_or_default(),
                edges: edges_by_fn.get(&fn_name).cloned().unwrap_or_default(),
                paths: path_bundles,
                summaries: summaries_by_fn.get(&fn_name).cloned().unwrap_or_default(),
                pp_coverage: pp_cov_by_fn.get(&fn_name).cloned().unwrap_or_default(),
            },
        );
    }
    out
}
