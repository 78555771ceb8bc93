//! Tagged symbolic value representation over Z3 sorts.
//!
//! An operand token may stand for a bit-vector, a real, or a string (see
//! `pubcheck_model::token`). [`SymValue`] lets one environment map hold all
//! three without the caller needing to know ahead of time which sort a given
//! identifier will resolve to.

use z3::ast::{Ast, Bool, Real, String as Z3String, BV};
use z3::Context;

/// A symbolic value of one of the sorts the operand lexicon can produce.
#[derive(Clone)]
pub enum SymValue<'ctx> {
    Bv(BV<'ctx>),
    Bool(Bool<'ctx>),
    Real(Real<'ctx>),
    Str(Z3String<'ctx>),
}

impl<'ctx> SymValue<'ctx> {
    /// The bit-width of this value if it is a bit-vector, else `None`.
    pub fn bv_width(&self) -> Option<u32> {
        match self {
            SymValue::Bv(b) => Some(b.get_size()),
            _ => None,
        }
    }

    /// Width used as the "current width" input to zext/sext: a bit-vector's
    /// own width, or 1 for anything else (booleans are conceptually 1 bit).
    pub fn width_or_one(&self) -> u32 {
        self.bv_width().unwrap_or(1)
    }

    /// Structural equality between two symbolic values: matching sorts
    /// compare directly (bit-vectors widened to a common width first);
    /// mismatched sorts coerce both sides through [`Self::as_bv`], the same
    /// policy arithmetic/comparison sites use.
    pub fn eq_expr(&self, ctx: &'ctx Context, other: &SymValue<'ctx>) -> Bool<'ctx> {
        match (self, other) {
            (SymValue::Bv(a), SymValue::Bv(b)) => {
                let width = a.get_size().max(b.get_size());
                self.as_bv(ctx, width)._eq(&other.as_bv(ctx, width))
            }
            (SymValue::Real(a), SymValue::Real(b)) => a._eq(b),
            (SymValue::Str(a), SymValue::Str(b)) => a._eq(b),
            (SymValue::Bool(a), SymValue::Bool(b)) => a._eq(b),
            _ => {
                let width = self.bv_width().or(other.bv_width()).unwrap_or(64);
                self.as_bv(ctx, width)._eq(&other.as_bv(ctx, width))
            }
        }
    }

    /// Coerces this value to a bit-vector of exactly `width` bits
    /// (`as_bv` in the source model): same width passes through, narrower
    /// zero-extends, wider truncates, and a boolean becomes a 1/0 select.
    pub fn as_bv(&self, ctx: &'ctx Context, width: u32) -> BV<'ctx> {
        match self {
            SymValue::Bv(b) => {
                let size = b.get_size();
                if size == width {
                    b.clone()
                } else if size < width {
                    b.zero_ext(width - size)
                } else {
                    b.extract(width - 1, 0)
                }
            }
            SymValue::Bool(b) => b.ite(&BV::from_u64(ctx, 1, width), &BV::from_u64(ctx, 0, width)),
            // Real/Str operands never legitimately reach an arithmetic site in
            // the opcode table; fall back to a deterministic zero so
            // evaluation can continue instead of aborting the path.
            SymValue::Real(_) | SymValue::Str(_) => BV::from_u64(ctx, 0, width),
        }
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
    fn as_bv_passthrough_same_width() {
        let ctx = ctx();
        let v = SymValue::Bv(BV::from_u64(&ctx, 5, 32));
        let out = v.as_bv(&ctx, 32);
        assert_eq!(out.get_size(), 32);
    }

    #[test]
    fn as_bv_zero_extends_narrower() {
        let ctx = ctx();
        let v = SymValue::Bv(BV::from_u64(&ctx, 5, 8));
        let out = v.as_bv(&ctx, 32);
        assert_eq!(out.get_size(), 32);
    }

    #[test]
    fn as_bv_truncates_wider() {
        let ctx = ctx();
        let v = SymValue::Bv(BV::from_u64(&ctx, 5, 64));
        let out = v.as_bv(&ctx, 8);
        assert_eq!(out.get_size(), 8);
    }

    #[test]
    fn as_bv_bool_becomes_one_bit_select() {
        let ctx = ctx();
        let v = SymValue::Bool(Bool::from_bool(&ctx, true));
        let out = v.as_bv(&ctx, 1);
        assert_eq!(out.get_size(), 1);
    }

    proptest::proptest! {
        #[test]
        fn as_bv_always_produces_the_requested_width(
            start_width in 1u32..65,
            target_width in 1u32..65,
            value in 0u64..u64::MAX,
        ) {
            let ctx = ctx();
            let masked = if start_width == 64 { value } else { value & ((1u64 << start_width) - 1) };
            let v = SymValue::Bv(BV::from_u64(&ctx, masked, start_width));
            let out = v.as_bv(&ctx, target_width);
            proptest::prop_assert_eq!(out.get_size(), target_width);
        }
    }
}
