//! Thin wrapper around a Z3 solver scoped to one path analysis.
//!
//! Grounded on the source model's `Z3Solver`: this crate only needs the
//! assert/push/pop/check surface, not its `add_constraint_str`/`_parse_value`
//! textual path (a second, less consistent encoding used by a different,
//! out-of-scope driver upstream).

use z3::ast::Bool;
use z3::{Context, SatResult};

pub struct Solver<'ctx> {
    inner: z3::Solver<'ctx>,
}

impl<'ctx> Solver<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Solver {
            inner: z3::Solver::new(ctx),
        }
    }

    pub fn assert(&self, expr: &Bool<'ctx>) {
        self.inner.assert(expr);
    }

    pub fn push(&self) {
        self.inner.push();
    }

    pub fn pop(&self) {
        self.inner.pop(1);
    }

    pub fn check(&self) -> SatResult {
        self.inner.check()
    }

    /// A stable-ish textual dump of the current assertion set, used as the
    /// base half of the query-cache fingerprint.
    pub fn assertions_sexpr(&self) -> String {
        self.inner.to_string()
    }
}
