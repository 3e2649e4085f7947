//! Probound computes tight probability bounds for derived boolean facts in a
//! probabilistic dependency graph. Given marginal probabilities for a set of
//! input facts whose pairwise correlations are only partially known, plus
//! conditional-dependency rules, it compiles each derived fact's probability
//! into a symbolic arithmetic-DNF expression over latent joint-distribution
//! variables, lowers that expression into degree-two algebraic constraints
//! and asks an external optimization oracle for the minimum and maximum of
//! the resulting objective.
//!
//! The symbolic layer is exact: probabilities are arbitrary-precision
//! rationals from ingestion through expression algebra, and only become
//! floating point at the [`Oracle`](oracle::Oracle) boundary.
//!
//! Joint distributions are materialized in full: a correlation class of n
//! facts costs 2^n decision variables, and cross-class products compound
//! this further. [`SolverConfig`](config::SolverConfig) bounds the class
//! size, and class sizes are logged so the blow-up stays visible.

pub mod bounds;
pub mod config;
pub mod oracle;
pub mod propagate;
pub mod solver;

mod build;
mod class;
mod context;
mod expr;
mod lower;
mod partition;
mod rules;
mod state;

#[cfg(test)]
mod test;

pub use bounds::FactBounds;
pub use config::SolverConfig;
pub use oracle::{Oracle, OracleVar, Sense, SolveStatus};
pub use propagate::PropagatingOracle;
pub use solver::{CompileError, Solver};

pub use probound_model::{BigRational, Problem, Rule, RuleProb};
