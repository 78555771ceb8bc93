//! The operand identifier lexicon.
//!
//! Every `uses`/`def` identifier that flows through a trace instruction or a
//! path condition is one of a small closed set of token shapes. This module
//! classifies a raw token string into that shape without touching a solver,
//! so both the constraint encoder and the symbolic engine in `pubcheck-engine`
//! can share one classification.

use sha2::{Digest, Sha256};

/// Bit-width used for anything without an explicit type: pointers, labels,
/// `null`/`undef`/`poison`, and variables referenced without a known type.
pub const POINTER_WIDTH: u32 = 64;

/// The shape of an operand identifier, inferred from its textual prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `const:iW:V` -- integer constant of bit-width `W` and value `V`.
    ConstInt { width: u32, value: i128 },
    /// `const:fp:...` -- floating point literal, modeled as a real.
    ConstFloat { literal: String },
    /// `const:null` / `const:undef` / `const:poison` -- zero of pointer width.
    ConstNullLike,
    /// `const:...` (anything else) -- an opaque string literal.
    ConstOpaque { literal: String },
    /// `label:...` -- a basic-block label, hashed to a stable bit-vector.
    Label { raw: String },
    /// Anything else: a variable identifier.
    Var,
}

/// A coarse sort hint used by the constraint encoder's paired-operand
/// inference (`_token_hint` in the source model): `bv` carries an optional
/// known width, the others do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortHint {
    Bv(Option<u32>),
    Real,
    Str,
    Var,
}

impl SortHint {
    pub fn is_var(&self) -> bool {
        matches!(self, SortHint::Var)
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, SortHint::Bv(_))
    }

    /// The known width for a `Bv` hint, if any. `None` for every other
    /// variant, including `Bv(None)`.
    pub fn width(&self) -> Option<u32> {
        match self {
            SortHint::Bv(w) => *w,
            _ => None,
        }
    }
}

/// Classify a raw operand token into its [`TokenKind`].
pub fn classify(token: &str) -> TokenKind {
    if let Some(rest) = token.strip_prefix("const:i") {
        if let Some((w, v)) = rest.split_once(':') {
            if let (Ok(width), Ok(value)) = (w.parse::<u32>(), v.parse::<i128>()) {
                return TokenKind::ConstInt { width, value };
            }
        }
    }
    if let Some(lit) = token.strip_prefix("const:fp:") {
        return TokenKind::ConstFloat {
            literal: lit.to_string(),
        };
    }
    if matches!(token, "const:null" | "const:undef" | "const:poison") {
        return TokenKind::ConstNullLike;
    }
    if let Some(lit) = token.strip_prefix("const:") {
        return TokenKind::ConstOpaque {
            literal: lit.to_string(),
        };
    }
    if token.starts_with("label:") {
        return TokenKind::Label {
            raw: token.to_string(),
        };
    }
    TokenKind::Var
}

/// Sort/width hint for a token, used when pairing two operands of a compare
/// (`_token_hint` in the source model): a bare variable carries no hint of
/// its own and inherits one from its counterpart.
pub fn sort_hint(token: &str) -> SortHint {
    match classify(token) {
        TokenKind::ConstInt { width, .. } => SortHint::Bv(Some(width)),
        TokenKind::ConstFloat { .. } => SortHint::Real,
        TokenKind::ConstNullLike => SortHint::Bv(Some(POINTER_WIDTH)),
        TokenKind::Label { .. } => SortHint::Bv(Some(POINTER_WIDTH)),
        TokenKind::ConstOpaque { .. } => SortHint::Str,
        TokenKind::Var => SortHint::Var,
    }
}

/// Deterministic bit-vector value for a `label:` token: the first 64 bits of
/// the SHA-256 digest of the raw token text, interpreted as a big-endian
/// integer.
pub fn label_value(raw: &str) -> u64 {
    let digest = Sha256::digest(raw.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Width carried by an LLVM-style type string: `iW` gives `W`; anything else
/// (including absent types, pointer types, and `...*`) falls back to
/// [`POINTER_WIDTH`].
pub fn type_width(ty: Option<&str>) -> u32 {
    match ty {
        Some(t) if t.starts_with('i') && t[1..].chars().all(|c| c.is_ascii_digit()) && t.len() > 1 => {
            t[1..].parse().unwrap_or(POINTER_WIDTH)
        }
        _ => POINTER_WIDTH,
    }
}
