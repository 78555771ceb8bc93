//! Constraint encoder: lifts a path's textual or structured path condition
//! into solver assertions (`_build_cmp_expr`/`_add_path_condition_json`/
//! `_add_path_conditions` in the source model).

use pubcheck_model::record::CfgPath;
use pubcheck_model::token::sort_hint;
use z3::ast::{Ast, Bool};
use z3::Context;

use crate::error::EncodeError;
use crate::solver::Solver;
use crate::state::SymState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

/// Builds the comparison expression for one `lhs==rhs`/`lhs!=rhs` atom,
/// resolving the sort/width of each side from its own token shape, with a
/// bare variable inheriting its counterpart's kind and width (the pairing
/// rule of `_token_hint`).
pub fn build_cmp_expr<'ctx>(
    ctx: &'ctx Context,
    state: &mut SymState<'ctx>,
    lhs: &str,
    rhs: &str,
    op: CmpOp,
) -> Result<Bool<'ctx>, EncodeError> {
    let l_hint = sort_hint(lhs);
    let r_hint = sort_hint(rhs);

    let mut lhs_kind = if l_hint.is_var() && !r_hint.is_var() { r_hint } else { l_hint };
    let mut rhs_kind = if r_hint.is_var() && !l_hint.is_var() { l_hint } else { r_hint };

    let lhs_width = if lhs_kind.is_bv() && l_hint.width().is_none() {
        r_hint.width()
    } else {
        l_hint.width()
    };
    let rhs_width = if rhs_kind.is_bv() && r_hint.width().is_none() {
        l_hint.width()
    } else {
        r_hint.width()
    };

    if lhs_kind.is_var() {
        lhs_kind = pubcheck_model::token::SortHint::Bv(lhs_width);
    }
    if rhs_kind.is_var() {
        rhs_kind = pubcheck_model::token::SortHint::Bv(rhs_width);
    }

    let l_val = state.eval_condition_token(ctx, lhs, lhs_kind);
    let r_val = state.eval_condition_token(ctx, rhs, rhs_kind);
    let eq = l_val.eq_expr(ctx, &r_val);

    Ok(match op {
        CmpOp::Eq => eq,
        CmpOp::Ne => eq.not(),
    })
}

fn parse_atom(atom: &str) -> Result<(&str, &str, CmpOp), EncodeError> {
    if let Some((l, r)) = atom.split_once("!=") {
        return Ok((l.trim(), r.trim(), CmpOp::Ne));
    }
    if let Some((l, r)) = atom.split_once("==") {
        return Ok((l.trim(), r.trim(), CmpOp::Eq));
    }
    Err(EncodeError::UnsupportedAtom {
        atom: atom.to_string(),
    })
}

fn build_json_node<'ctx>(
    ctx: &'ctx Context,
    state: &mut SymState<'ctx>,
    node: &serde_json::Value,
) -> Result<Bool<'ctx>, EncodeError> {
    let op = node
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EncodeError::MalformedJson {
            detail: "path condition node missing 'op'".to_string(),
        })?;
    match op {
        "and" => {
            let terms = node
                .get("terms")
                .and_then(|v| v.as_array())
                .ok_or_else(|| EncodeError::MalformedJson {
                    detail: "'and' node missing 'terms' array".to_string(),
                })?;
            let mut exprs = Vec::with_capacity(terms.len());
            for term in terms {
                exprs.push(build_json_node(ctx, state, term)?);
            }
            let refs: Vec<&Bool> = exprs.iter().collect();
            Ok(Bool::and(ctx, &refs))
        }
        "==" | "!=" => {
            let lhs = node.get("lhs").and_then(|v| v.as_str()).ok_or_else(|| {
                EncodeError::MalformedJson {
                    detail: format!("'{op}' node missing 'lhs'"),
                }
            })?;
            let rhs = node.get("rhs").and_then(|v| v.as_str()).ok_or_else(|| {
                EncodeError::MalformedJson {
                    detail: format!("'{op}' node missing 'rhs'"),
                }
            })?;
            let cmp = if op == "==" { CmpOp::Eq } else { CmpOp::Ne };
            build_cmp_expr(ctx, state, lhs, rhs, cmp)
        }
        other => Err(EncodeError::UnsupportedJsonOp {
            op: other.to_string(),
        }),
    }
}

/// Asserts a path's condition against one state's solver, preferring the
/// structured form when non-empty.
fn add_path_condition_for_state<'ctx>(
    ctx: &'ctx Context,
    state: &mut SymState<'ctx>,
    solver: &Solver<'ctx>,
    path: &CfgPath,
) -> Result<(), EncodeError> {
    if !path.path_cond_json.is_empty() {
        for node in &path.path_cond_json {
            let expr = build_json_node(ctx, state, node)?;
            solver.assert(&expr);
        }
        return Ok(());
    }
    for cond in &path.path_cond {
        for atom in cond.split(" && ") {
            let (lhs, rhs, op) = parse_atom(atom)?;
            let expr = build_cmp_expr(ctx, state, lhs, rhs, op)?;
            solver.assert(&expr);
        }
    }
    Ok(())
}

/// Asserts the path condition against both states/solvers (asserted twice,
/// once per run, per the dual-execution design).
pub fn add_path_conditions<'ctx>(
    ctx: &'ctx Context,
    state_a: &mut SymState<'ctx>,
    state_b: &mut SymState<'ctx>,
    solver: &Solver<'ctx>,
    path: &CfgPath,
) -> Result<(), EncodeError> {
    add_path_condition_for_state(ctx, state_a, solver, path)?;
    add_path_condition_for_state(ctx, state_b, solver, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::{Config, SatResult};

    fn ctx() -> Context {
        Context::new(&Config::new())
    }

    #[test]
    fn width_coercion_never_raises_on_widened_compare() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let solver = Solver::new(&ctx);
        let e1 = build_cmp_expr(&ctx, &mut state, "v", "const:i32:0", CmpOp::Eq).unwrap();
        solver.assert(&e1);
        let e2 = build_cmp_expr(&ctx, &mut state, "v", "const:i64:0", CmpOp::Eq).unwrap();
        solver.assert(&e2);
        assert_eq!(solver.check(), SatResult::Sat);
    }

    #[test]
    fn unsupported_atom_is_a_hard_error() {
        let err = parse_atom("v <> const:i32:0").unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedAtom { .. }));
    }

    #[test]
    fn json_and_node_conjoins_terms() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let node: serde_json::Value = serde_json::json!({
            "op": "and",
            "terms": [
                {"op": "==", "lhs": "const:i32:1", "rhs": "const:i32:1"},
                {"op": "!=", "lhs": "const:i32:1", "rhs": "const:i32:2"},
            ]
        });
        let expr = build_json_node(&ctx, &mut state, &node).unwrap();
        let solver = Solver::new(&ctx);
        solver.assert(&expr);
        assert_eq!(solver.check(), SatResult::Sat);
    }

    #[test]
    fn label_tokens_hash_to_pointer_width_bitvectors() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let e = build_cmp_expr(&ctx, &mut state, "label:bb1", "label:bb1", CmpOp::Eq).unwrap();
        let solver = Solver::new(&ctx);
        solver.assert(&e);
        assert_eq!(solver.check(), SatResult::Sat);
    }
}
