//! Dual-execution analysis of one CFG path -- the engine's core loop.
//!
//! Replays a path's joined instruction list into two symbolic states sharing
//! one solver, asserts the path condition and transmitter equalities against
//! both, then issues one push/assert/check/pop query per defined value.

use std::collections::HashMap;
use std::time::Instant;

use pubcheck_model::join::PathBundle;
use pubcheck_model::record::{PathAnalysisSummary, PathPublicness};
use pubcheck_model::token::{type_width, POINTER_WIDTH};
use sha2::{Digest, Sha256};
use z3::ast::Bool;
use z3::{Context, SatResult};

use crate::encoder::add_path_conditions;
use crate::error::EncodeError;
use crate::eval::eval_inst;
use crate::solver::Solver;
use crate::state::SymState;

/// Query-result cache keyed by assertion fingerprint, shared across path
/// analyses within one engine instance. Passing a fresh, empty map (or
/// dropping it after one call) disables caching without changing verdicts --
/// only `cache_hits`/`cache_misses` move.
pub type QueryCache = HashMap<String, SatResult>;

fn fingerprint(base_sexpr: &str, diff_sexpr: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_sexpr.as_bytes());
    hasher.update(b"|");
    hasher.update(diff_sexpr.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Analyzes one path, returning its per-definition verdicts and a summary of
/// the queries issued. `cache` is optional; pass `None` to run uncached.
pub fn analyze_path<'ctx>(
    ctx: &'ctx Context,
    bundle: &PathBundle,
    cache: Option<&mut QueryCache>,
) -> Result<(Vec<PathPublicness>, PathAnalysisSummary), EncodeError> {
    let path_id = bundle.path.path_id.unwrap_or(-1);
    let function = bundle.path.function.clone();

    let solver = Solver::new(ctx);
    let mut state_a = SymState::new("A");
    let mut state_b = SymState::new("B");

    let mut scratch_cache = HashMap::new();
    let cache = cache.unwrap_or(&mut scratch_cache);

    let mut verdicts = Vec::new();
    let mut def_count = 0u64;
    let mut query_count = 0u64;
    let mut sat_count = 0u64;
    let mut unsat_count = 0u64;
    let mut unknown_count = 0u64;
    let mut cache_hits = 0u64;
    let mut cache_misses = 0u64;
    let mut solver_time_ms = 0.0f64;

    // Pass 1: replay every instruction into both states, only *collecting*
    // transmitter equalities -- nothing is asserted yet, so no query in
    // pass 3 can observe an equality contributed by an instruction that
    // hasn't been reached yet in the replay.
    let mut tx_equalities: Vec<Bool<'ctx>> = Vec::new();
    let mut current_bb: Option<String> = None;
    let mut prev_bb: Option<String> = None;

    for inst in &bundle.insts {
        if current_bb.as_deref() != Some(inst.bb.as_str()) {
            prev_bb = current_bb.take();
            current_bb = Some(inst.bb.clone());
        }

        eval_inst(ctx, &mut state_a, inst, prev_bb.as_deref());
        eval_inst(ctx, &mut state_b, inst, prev_bb.as_deref());

        if let Some(tx) = &inst.tx {
            if let Some(op) = inst.uses.get(tx.which) {
                let width = inst
                    .use_tys
                    .as_ref()
                    .and_then(|tys| tys.get(tx.which))
                    .map(|ty| type_width(Some(ty)))
                    .unwrap_or(POINTER_WIDTH);
                let va = state_a.eval_operand(ctx, op, width);
                let vb = state_b.eval_operand(ctx, op, width);
                tx_equalities.push(va.eq_expr(ctx, &vb));
            }
        }
    }

    // Pass 2: assert the path condition for both states, then every
    // transmitter equality collected above, so every assertion for the
    // whole path is in place before any query is issued.
    add_path_conditions(ctx, &mut state_a, &mut state_b, &solver, &bundle.path)?;
    for eq in &tx_equalities {
        solver.assert(eq);
    }

    // Pass 3: now that the full assertion set is in place, walk the
    // instructions again and issue one push/assert-diff/check/pop query per
    // defined value.
    for inst in &bundle.insts {
        let Some(def) = &inst.def_id else { continue };
        def_count += 1;
        query_count += 1;

        let a_val = state_a.env.get(def).cloned();
        let b_val = state_b.env.get(def).cloned();
        let (a_val, b_val) = match (a_val, b_val) {
            (Some(a), Some(b)) => (a, b),
            // Every opcode arm in `eval_inst` binds its `def_id`; this branch
            // exists only as a defensive fallback should that invariant ever
            // be violated upstream.
            _ => {
                unknown_count += 1;
                verdicts.push(PathPublicness::new(&function, path_id, &inst.pp, def, None));
                continue;
            }
        };

        let diff = a_val.eq_expr(ctx, &b_val).not();
        let base_sexpr = solver.assertions_sexpr();
        let key = fingerprint(&base_sexpr, &diff.to_string());

        let result = if let Some(cached) = cache.get(&key) {
            cache_hits += 1;
            *cached
        } else {
            cache_misses += 1;
            let start = Instant::now();
            solver.push();
            solver.assert(&diff);
            let r = solver.check();
            solver.pop();
            solver_time_ms += start.elapsed().as_secs_f64() * 1000.0;
            cache.insert(key, r);
            r
        };

        let public = match result {
            SatResult::Sat => {
                sat_count += 1;
                Some(true)
            }
            SatResult::Unsat => {
                unsat_count += 1;
                Some(false)
            }
            SatResult::Unknown => {
                unknown_count += 1;
                None
            }
        };
        verdicts.push(PathPublicness::new(&function, path_id, &inst.pp, def, public));
    }

    let summary = PathAnalysisSummary::new(
        function,
        path_id,
        bundle.insts.len() as u64,
        def_count,
        query_count,
        sat_count,
        unsat_count,
        unknown_count,
        solver_time_ms,
        cache_hits,
        cache_misses,
    );

    Ok((verdicts, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubcheck_model::record::{CfgPath, TraceInst, TxInfo};
    use z3::Config;

    fn ctx() -> Context {
        Context::new(&Config::new())
    }

    fn path(path_cond: Vec<&str>) -> CfgPath {
        CfgPath {
            kind: "path".to_string(),
            function: "f".to_string(),
            path_id: Some(0),
            bbs: vec!["b0".to_string()],
            decisions: Vec::new(),
            path_cond: path_cond.into_iter().map(|s| s.to_string()).collect(),
            path_cond_json: Vec::new(),
            pp_seq: Vec::new(),
        }
    }

    fn inst(op: &str, def: &str, uses: Vec<&str>, ty: &str, tx: Option<TxInfo>) -> TraceInst {
        TraceInst {
            function: "f".to_string(),
            bb: "b0".to_string(),
            pp: format!("p_{def}"),
            op: op.to_string(),
            def_id: Some(def.to_string()),
            uses: uses.into_iter().map(|s| s.to_string()).collect(),
            tx,
            def_ty: Some(ty.to_string()),
            use_tys: None,
            icmp_pred: None,
        }
    }

    #[test]
    fn constant_copy_is_not_public() {
        let ctx = ctx();
        let bundle = PathBundle {
            path: path(vec![]),
            insts: vec![inst("add", "d", vec!["const:i32:1", "const:i32:2"], "i32", None)],
        };
        let (verdicts, summary) = analyze_path(&ctx, &bundle, None).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].public, Some(false));
        assert_eq!(summary.query_count, 1);
    }

    #[test]
    fn free_load_is_public() {
        let ctx = ctx();
        let bundle = PathBundle {
            path: path(vec![]),
            insts: vec![inst("load", "s", vec!["ptrX"], "i32", None)],
        };
        let (verdicts, _) = analyze_path(&ctx, &bundle, None).unwrap();
        assert_eq!(verdicts[0].public, Some(true));
    }

    #[test]
    fn transmitter_fixes_the_loaded_secret() {
        let ctx = ctx();
        let bundle = PathBundle {
            path: path(vec![]),
            insts: vec![
                inst("load", "s", vec!["ptrX"], "i32", None),
                inst(
                    "call",
                    "sink",
                    vec!["s"],
                    "i32",
                    Some(TxInfo {
                        kind: "leak".to_string(),
                        which: 0,
                    }),
                ),
            ],
        };
        let (verdicts, _) = analyze_path(&ctx, &bundle, None).unwrap();
        let s = verdicts.iter().find(|v| v.value == "s").unwrap();
        assert_eq!(s.public, Some(false));
    }

    #[test]
    fn path_condition_pins_loaded_value() {
        let ctx = ctx();
        let bundle = PathBundle {
            path: path(vec!["s==const:i32:0"]),
            insts: vec![inst("load", "s", vec!["ptrX"], "i32", None)],
        };
        let (verdicts, _) = analyze_path(&ctx, &bundle, None).unwrap();
        assert_eq!(verdicts[0].public, Some(false));
    }

    #[test]
    fn cache_does_not_change_verdicts() {
        let ctx = ctx();
        let bundle = PathBundle {
            path: path(vec![]),
            insts: vec![inst("load", "s", vec!["ptrX"], "i32", None)],
        };
        let mut cache = QueryCache::new();
        let (uncached, _) = analyze_path(&ctx, &bundle, None).unwrap();
        let (cached, _) = analyze_path(&ctx, &bundle, Some(&mut cache)).unwrap();
        assert_eq!(uncached[0].public, cached[0].public);
    }
}
