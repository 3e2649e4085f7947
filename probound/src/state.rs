//! Miscellaneous compilation state.

/// Phase tracking for the compilation pipeline.
///
/// Constraint emission must complete before any output expression is built;
/// this is enforced by the top-level phase order in
/// [`Solver`](crate::solver::Solver), which records its progress here.
/// Anything larger or any larger group of related state variables should be
/// moved into a separate part of [`Context`](crate::context::Context).
#[derive(Default)]
pub struct CompileState {
    pub problem_loaded: bool,
    pub constraints_emitted: bool,
}
