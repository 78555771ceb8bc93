//! One symbolic run's environment (`SymState` in the source model).
//!
//! Two of these, tagged `A` and `B`, are replayed over the same instruction
//! list during one path's analysis. Each owns an independent environment and
//! memory map; the tag is threaded into every freshly-minted symbol name so
//! the two runs can never alias each other by accident.

use std::collections::HashMap;

use pubcheck_model::token::{classify, label_value, sort_hint, type_width, SortHint, TokenKind, POINTER_WIDTH};
use z3::ast::{Real, String as Z3String, BV};
use z3::Context;

use crate::consts::{const_bv_bits, parse_real_literal, string_literal};
use crate::value::SymValue;

/// One run's symbolic environment and memory.
pub struct SymState<'ctx> {
    pub tag: &'static str,
    pub env: HashMap<String, SymValue<'ctx>>,
    pub mem: HashMap<String, SymValue<'ctx>>,
    fresh_id: u64,
}

impl<'ctx> SymState<'ctx> {
    pub fn new(tag: &'static str) -> Self {
        SymState {
            tag,
            env: HashMap::new(),
            mem: HashMap::new(),
            fresh_id: 0,
        }
    }

    fn next_name(&mut self, hint: &str) -> String {
        let id = self.fresh_id;
        self.fresh_id += 1;
        format!("{}_{}_{}", self.tag, hint, id)
    }

    /// Mints a fresh, run-tagged bit-vector symbol.
    pub fn fresh_bv(&mut self, ctx: &'ctx Context, hint: &str, width: u32) -> BV<'ctx> {
        let name = self.next_name(hint);
        BV::new_const(ctx, name, width)
    }

    /// Mints a fresh, run-tagged symbol of the sort described by `hint`.
    pub fn fresh_typed(&mut self, ctx: &'ctx Context, hint: &str, sort: SortHint) -> SymValue<'ctx> {
        match sort {
            SortHint::Real => {
                let name = self.next_name(hint);
                SymValue::Real(Real::new_const(ctx, name))
            }
            SortHint::Str => {
                let name = self.next_name(hint);
                SymValue::Str(Z3String::new_const(ctx, name))
            }
            SortHint::Bv(width) => {
                SymValue::Bv(self.fresh_bv(ctx, hint, width.unwrap_or(POINTER_WIDTH)))
            }
            SortHint::Var => SymValue::Bv(self.fresh_bv(ctx, hint, POINTER_WIDTH)),
        }
    }

    fn parse_const(&self, ctx: &'ctx Context, token: &str, fallback_width: u32) -> SymValue<'ctx> {
        match classify(token) {
            TokenKind::ConstInt { width, value } => {
                let width = if width == 0 { fallback_width } else { width };
                SymValue::Bv(BV::from_u64(ctx, const_bv_bits(value, width), width))
            }
            TokenKind::ConstFloat { literal } => SymValue::Real(parse_real_literal(ctx, &literal)),
            TokenKind::ConstNullLike => SymValue::Bv(BV::from_u64(ctx, 0, POINTER_WIDTH)),
            TokenKind::ConstOpaque { literal } => SymValue::Str(string_literal(ctx, &literal)),
            TokenKind::Label { .. } | TokenKind::Var => {
                unreachable!("parse_const called on a non-const token")
            }
        }
    }

    /// Evaluates an instruction operand (`_eval_operand` in the source
    /// model): only the `const:` prefix is special-cased here -- a `label:`
    /// token used as an instruction operand is treated as an ordinary
    /// variable identifier, matching the source model's behavior.
    pub fn eval_operand(&mut self, ctx: &'ctx Context, operand: &str, width: u32) -> SymValue<'ctx> {
        if operand.starts_with("const:") {
            return self.parse_const(ctx, operand, width);
        }
        if let Some(v) = self.env.get(operand) {
            return v.clone();
        }
        let fresh = SymValue::Bv(self.fresh_bv(ctx, &format!("u_{operand}"), width));
        self.env.insert(operand.to_string(), fresh.clone());
        fresh
    }

    /// Evaluates a path-condition token (`_eval_condition_token` in the
    /// source model): here `label:` tokens are hashed deterministically, and
    /// a variable's coercion is driven by `prefer`.
    pub fn eval_condition_token(
        &mut self,
        ctx: &'ctx Context,
        token: &str,
        prefer: SortHint,
    ) -> SymValue<'ctx> {
        match classify(token) {
            TokenKind::ConstInt { width, value } => {
                let width = if width == 0 {
                    prefer.width().unwrap_or(POINTER_WIDTH)
                } else {
                    width
                };
                SymValue::Bv(BV::from_u64(ctx, const_bv_bits(value, width), width))
            }
            TokenKind::ConstFloat { literal } => SymValue::Real(parse_real_literal(ctx, &literal)),
            TokenKind::ConstNullLike => SymValue::Bv(BV::from_u64(ctx, 0, POINTER_WIDTH)),
            TokenKind::ConstOpaque { literal } => SymValue::Str(string_literal(ctx, &literal)),
            TokenKind::Label { raw } => {
                let width = prefer.width().unwrap_or(POINTER_WIDTH);
                SymValue::Bv(BV::from_u64(ctx, label_value(&raw), width))
            }
            TokenKind::Var => {
                if let Some(existing) = self.env.get(token) {
                    let existing = existing.clone();
                    return if prefer.is_bv() {
                        SymValue::Bv(existing.as_bv(ctx, prefer.width().unwrap_or(POINTER_WIDTH)))
                    } else {
                        existing
                    };
                }
                let fresh = self.fresh_typed(ctx, &format!("pc_{token}"), prefer);
                self.env.insert(token.to_string(), fresh.clone());
                fresh
            }
        }
    }

    /// Width of a defined value given its declared type string.
    pub fn def_width(def_ty: Option<&str>) -> u32 {
        type_width(def_ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::Config;

    fn ctx() -> Context {
        Context::new(&Config::new())
    }

    #[test]
    fn eval_operand_binds_and_reuses_variables() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let a = state.eval_operand(&ctx, "x", 32);
        let b = state.eval_operand(&ctx, "x", 32);
        match (a, b) {
            (SymValue::Bv(a), SymValue::Bv(b)) => assert!(a == b),
            _ => panic!("expected bit-vectors"),
        }
    }

    #[test]
    fn eval_operand_treats_label_token_as_variable() {
        let ctx = ctx();
        let mut state = SymState::new("A");
        let v = state.eval_operand(&ctx, "label:bb1", 64);
        assert!(matches!(v, SymValue::Bv(_)));
        assert!(state.env.contains_key("label:bb1"));
    }

    #[test]
    fn eval_condition_token_hashes_label_deterministically() {
        let ctx = ctx();
        let mut a = SymState::new("A");
        let mut b = SymState::new("B");
        let va = a.eval_condition_token(&ctx, "label:bb1", SortHint::Bv(Some(64)));
        let vb = b.eval_condition_token(&ctx, "label:bb1", SortHint::Bv(Some(64)));
        match (va, vb) {
            (SymValue::Bv(x), SymValue::Bv(y)) => assert!(x == y),
            _ => panic!("expected bit-vectors"),
        }
    }

    #[test]
    fn two_states_never_alias_fresh_symbols() {
        let ctx = ctx();
        let mut a = SymState::new("A");
        let mut b = SymState::new("B");
        let va = a.eval_operand(&ctx, "s", 32);
        let vb = b.eval_operand(&ctx, "s", 32);
        match (va, vb) {
            (SymValue::Bv(x), SymValue::Bv(y)) => assert!(x != y),
            _ => panic!("expected bit-vectors"),
        }
    }
}
