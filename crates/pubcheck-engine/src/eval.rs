//! Per-instruction symbolic evaluation (`_eval_inst` in the source model).
//!
//! One call evaluates one instruction in one state. The caller (the
//! dual-execution loop in `analyze`) invokes this once per state per
//! instruction, with identical logic and independent environments.

use pubcheck_model::record::TraceInst;
use pubcheck_model::token::{type_width, POINTER_WIDTH};
use z3::ast::{Ast, Bool, BV};
use z3::Context;

use crate::opcode::Opcode;
use crate::state::SymState;
use crate::value::SymValue;

fn operand_width(inst: &TraceInst, idx: usize, fallback: u32) -> u32 {
    inst.use_tys
        .as_ref()
        .and_then(|tys| tys.get(idx))
        .map(|ty| type_width(Some(ty)))
        .unwrap_or(fallback)
}

fn get_operand<'ctx>(
    ctx: &'ctx Context,
    state: &mut SymState<'ctx>,
    inst: &TraceInst,
    idx: usize,
    fallback_width: u32,
) -> SymValue<'ctx> {
    let width = operand_width(inst, idx, fallback_width);
    match inst.uses.get(idx) {
        Some(token) => state.eval_operand(ctx, token, width),
        None => {
            let tag = state.tag;
            SymValue::Bv(state.fresh_bv(ctx, &format!("missing_{tag}"), width))
        }
    }
}

/// Signed/unsigned integer-compare predicate, including the float-alias
/// names treated as plain `eq`/`ne`. An unrecognized predicate is treated as
/// always-true (conservative-public), per the engine's failure semantics.
fn icmp_pred<'ctx>(ctx: &'ctx Context, pred: &str, a: &BV<'ctx>, b: &BV<'ctx>) -> Bool<'ctx> {
    match pred {
        "eq" | "oeq" | "ueq" => a._eq(b),
        "ne" | "one" | "une" => a._eq(b).not(),
        "slt" => a.bvslt(b),
        "sle" => a.bvsle(b),
        "sgt" => a.bvsgt(b),
        "sge" => a.bvsge(b),
        "ult" => a.bvult(b),
        "ule" => a.bvule(b),
        "ugt" => a.bvugt(b),
        "uge" => a.bvuge(b),
        _ => Bool::from_bool(ctx, true),
    }
}

/// Evaluates one instruction in `state`, binding `inst.def_id` if it defines
/// a value. `prev_bb` is the previously-executed block (for PHI resolution).
pub fn eval_inst<'ctx>(
    ctx: &'ctx Context,
    state: &mut SymState<'ctx>,
    inst: &TraceInst,
    prev_bb: Option<&str>,
) {
    let def_width = SymState::def_width(inst.def_ty.as_deref());
    let opcode = Opcode::parse(&inst.op);

    let result: Option<SymValue<'ctx>> = match opcode {
        Opcode::Alloca => Some(SymValue::Bv(state.fresh_bv(ctx, "alloca", POINTER_WIDTH))),

        Opcode::Load => {
            let ptr = inst.uses.first().cloned().unwrap_or_default();
            if let Some(v) = state.mem.get(&ptr) {
                Some(v.clone())
            } else {
                let fresh = SymValue::Bv(state.fresh_bv(ctx, "load", def_width));
                state.mem.insert(ptr, fresh.clone());
                Some(fresh)
            }
        }

        Opcode::Store => {
            let ptr = inst.uses.first().cloned().unwrap_or_default();
            let val = get_operand(ctx, state, inst, 1, def_width);
            state.mem.insert(ptr, val);
            None
        }

        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor
        | Opcode::Shl | Opcode::Lshr | Opcode::Ashr => {
            let a = get_operand(ctx, state, inst, 0, def_width).as_bv(ctx, def_width);
            let b = get_operand(ctx, state, inst, 1, def_width).as_bv(ctx, def_width);
            let bv = match opcode {
                Opcode::Add => a.bvadd(&b),
                Opcode::Sub => a.bvsub(&b),
                Opcode::Mul => a.bvmul(&b),
                Opcode::And => a.bvand(&b),
                Opcode::Or => a.bvor(&b),
                Opcode::Xor => a.bvxor(&b),
                Opcode::Shl => a.bvshl(&b),
                Opcode::Lshr => a.bvlshr(&b),
                Opcode::Ashr => a.bvashr(&b),
                _ => unreachable!(),
            };
            Some(SymValue::Bv(bv))
        }

        Opcode::Icmp => {
            let width = operand_width(inst, 0, def_width.max(1));
            let a = get_operand(ctx, state, inst, 0, width).as_bv(ctx, width);
            let b = get_operand(ctx, state, inst, 1, width).as_bv(ctx, width);
            let pred = inst.icmp_pred.as_deref().unwrap_or("eq");
            let cond = icmp_pred(ctx, pred, &a, &b);
            Some(SymValue::Bv(cond.ite(&BV::from_u64(ctx, 1, 1), &BV::from_u64(ctx, 0, 1))))
        }

        Opcode::Zext | Opcode::Sext => {
            let from_width = operand_width(inst, 0, 1);
            let v = get_operand(ctx, state, inst, 0, from_width).as_bv(ctx, from_width);
            let cur = v.get_size();
            let bv = if def_width >= cur {
                let delta = def_width - cur;
                if delta == 0 {
                    v
                } else if opcode == Opcode::Zext {
                    v.zero_ext(delta)
                } else {
                    v.sign_ext(delta)
                }
            } else {
                v.extract(def_width.saturating_sub(1), 0)
            };
            Some(SymValue::Bv(bv))
        }

        Opcode::Trunc => {
            let from_width = operand_width(inst, 0, def_width);
            let v = get_operand(ctx, state, inst, 0, from_width).as_bv(ctx, from_width);
            let cur = v.get_size();
            let bv = if def_width < cur {
                v.extract(def_width.saturating_sub(1), 0)
            } else {
                v.zero_ext(def_width - cur)
            };
            Some(SymValue::Bv(bv))
        }

        Opcode::Select => {
            let cond = get_operand(ctx, state, inst, 0, 1).as_bv(ctx, 1);
            let is_true = cond._eq(&BV::from_u64(ctx, 1, 1));
            let then_v = get_operand(ctx, state, inst, 1, def_width).as_bv(ctx, def_width);
            let else_v = get_operand(ctx, state, inst, 2, def_width).as_bv(ctx, def_width);
            Some(SymValue::Bv(is_true.ite(&then_v, &else_v)))
        }

        Opcode::GetElementPtr => {
            let base = get_operand(ctx, state, inst, 0, POINTER_WIDTH).as_bv(ctx, POINTER_WIDTH);
            let last = inst.uses.len().saturating_sub(1);
            let index = get_operand(ctx, state, inst, last, POINTER_WIDTH).as_bv(ctx, POINTER_WIDTH);
            Some(SymValue::Bv(base.bvadd(&index)))
        }

        Opcode::Phi => {
            // Operands come in (value, block) pairs; the value whose paired
            // block equals the previously-executed block wins, else the
            // first pair.
            let mut first: Option<SymValue<'ctx>> = None;
            let mut chosen: Option<SymValue<'ctx>> = None;
            let mut i = 0;
            while i + 1 < inst.uses.len() {
                if first.is_none() {
                    first = Some(get_operand(ctx, state, inst, i, def_width));
                }
                let block_tok = inst.uses[i + 1].as_str();
                if prev_bb == Some(block_tok) {
                    chosen = Some(get_operand(ctx, state, inst, i, def_width));
                }
                i += 2;
            }
            chosen.or(first)
        }

        // `call` drops argument-to-result data flow and binds a fresh value
        // per state: unsound for any callee with observable side effects,
        // but this matches the source model and no effect-summary mechanism
        // is in scope here.
        Opcode::Call => Some(SymValue::Bv(state.fresh_bv(ctx, "call", def_width))),

        Opcode::Other => Some(SymValue::Bv(state.fresh_bv(ctx, "other", def_width))),
    };

    if let (Some(def), Some(value)) = (&inst.def_id, result) {
        state.env.insert(def.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::{Config, SatResult};

    fn ctx() -> Context {
        Context::new(&Config::new())
    }

    fn inst(op: &str, def: Option<&str>, uses: Vec<&str>, def_ty: Option<&str>) -> TraceInst {
        TraceInst {
            function: "f".to_string(),
            bb: "b0".to_string(),
            pp: "p0".to_string(),
            op: op.to_string(),
            def_id: def.map(|s| s.to_string()),
            uses: uses.into_iter().map(|s| s.to_string()).collect(),
            tx: None,
            def_ty: def_ty.map(|s| s.to_string()),
            use_tys: None,
            icmp_pred: None,
        }
    }

    #[test]
    fn constant_add_binds_deterministic_value() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let i = inst("add", Some("d"), vec!["const:i32:1", "const:i32:2"], Some("i32"));
        eval_inst(&ctx, &mut state, &i, None);
        let d = state.env.get("d").unwrap();
        match d {
            SymValue::Bv(bv) => {
                let expected = BV::from_u64(&ctx, 3, 32);
                let solver = z3::Solver::new(&ctx);
                solver.assert(&bv._eq(&expected));
                assert_eq!(solver.check(), SatResult::Sat);
            }
            _ => panic!("expected bv"),
        }
    }

    #[test]
    fn load_introduces_fresh_value_and_caches_by_pointer() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let i = inst("load", Some("s"), vec!["ptrX"], Some("i32"));
        eval_inst(&ctx, &mut state, &i, None);
        assert!(state.mem.contains_key("ptrX"));
        assert!(state.env.contains_key("s"));
    }

    #[test]
    fn phi_picks_matching_block_else_first() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let i = inst(
            "phi",
            Some("v"),
            vec!["const:i32:0", "b0", "const:i32:1", "b1"],
            Some("i32"),
        );
        eval_inst(&ctx, &mut state, &i, Some("b1"));
        match state.env.get("v").unwrap() {
            SymValue::Bv(bv) => {
                let solver = z3::Solver::new(&ctx);
                solver.assert(&bv._eq(&BV::from_u64(&ctx, 1, 32)));
                assert_eq!(solver.check(), SatResult::Sat);
            }
            _ => panic!("expected bv"),
        }

        let mut state2 = SymState::new("A");
        eval_inst(&ctx, &mut state2, &i, None);
        match state2.env.get("v").unwrap() {
            SymValue::Bv(bv) => {
                let solver = z3::Solver::new(&ctx);
                solver.assert(&bv._eq(&BV::from_u64(&ctx, 0, 32)));
                assert_eq!(solver.check(), SatResult::Sat);
            }
            _ => panic!("expected bv"),
        }
    }

    #[test]
    fn unknown_opcode_binds_fresh_symbol_without_aborting() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let i = inst("frobnicate", Some("x"), vec![], Some("i32"));
        eval_inst(&ctx, &mut state, &i, None);
        assert!(state.env.contains_key("x"));
    }
}
