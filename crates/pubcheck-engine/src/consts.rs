//! Literal construction for the `const:...` operand lexicon.

use z3::ast::{Real, String as Z3String};
use z3::Context;

/// Builds a bit-vector constant from a signed value, masking and truncating
/// to `width` bits (two's complement). Widths above 64 are not modeled
/// precisely; the token lexicon observed in practice stays at or below 64.
pub fn const_bv_bits(value: i128, width: u32) -> u64 {
    if width == 0 {
        return 0;
    }
    if width >= 128 {
        return value as u64;
    }
    let mask: i128 = (1i128 << width) - 1;
    (value & mask) as u64
}

/// Parses a `const:fp:...` literal into a Z3 real. Decimal literals are
/// turned into an exact numerator/denominator pair; anything that doesn't
/// parse as a plain decimal falls back to `0`.
pub fn parse_real_literal<'ctx>(ctx: &'ctx Context, literal: &str) -> Real<'ctx> {
    let negative = literal.starts_with('-');
    let unsigned = literal.trim_start_matches('-');
    match unsigned.split_once('.') {
        Some((int_part, frac_part)) => {
            let denom: i64 = 10i64.saturating_pow(frac_part.len() as u32);
            let int_val: i64 = int_part.parse().unwrap_or(0);
            let frac_val: i64 = frac_part.parse().unwrap_or(0);
            let numer = int_val.saturating_mul(denom).saturating_add(frac_val);
            let numer = if negative { -numer } else { numer };
            Real::from_real(ctx, numer as i32, denom as i32)
        }
        None => {
            let whole: i64 = unsigned.parse().unwrap_or(0);
            let whole = if negative { -whole } else { whole };
            Real::from_real(ctx, whole as i32, 1)
        }
    }
}

/// Builds a Z3 string constant from an opaque constant literal.
pub fn string_literal<'ctx>(ctx: &'ctx Context, literal: &str) -> Z3String<'ctx> {
    Z3String::from_str(ctx, literal).unwrap_or_else(|_| Z3String::new_const(ctx, literal))
}
