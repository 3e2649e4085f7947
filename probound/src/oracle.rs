//! Optimization oracle interface.
//!
//! The engine treats the nonconvex constrained optimizer as an external
//! black box behind the [`Oracle`] trait. Everything handed across this
//! boundary is `f64`; this is the only place where the exact symbolic layer
//! meets floating point.
use serde::{Deserialize, Serialize};

/// A continuous decision variable owned by the oracle.
///
/// Oracles issue these sequentially from [`Oracle::add_variable`]; the
/// engine treats them as opaque handles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct OracleVar {
    index: u32,
}

impl OracleVar {
    /// Creates a variable handle from a 0-based index.
    #[inline]
    pub fn from_index(index: usize) -> OracleVar {
        OracleVar {
            index: index as u32,
        }
    }

    /// The 0-based index of this variable.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Optimization direction.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Outcome of one oracle invocation.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal(f64),
    Infeasible,
    Unbounded,
    NumericalError,
}

impl SolveStatus {
    /// The optimal objective value, if one was found.
    pub fn value(self) -> Option<f64> {
        match self {
            SolveStatus::Optimal(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this invocation found an optimum.
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal(_))
    }
}

/// External nonconvex constrained optimization backend.
///
/// The engine only relies on this minimal capability set: bounded continuous
/// variables, linear equalities, binary product equalities and a single
/// variable objective optimized in either direction. Every constraint the
/// engine emits has degree at most two; higher-degree monomials are chained
/// through auxiliary variables before they reach the oracle.
pub trait Oracle {
    /// Creates a continuous decision variable bounded to `[lower, upper]`.
    fn add_variable(&mut self, name: &str, lower: f64, upper: f64) -> OracleVar;

    /// Adds the constraint `sum of coefficient * variable == constant`.
    fn add_linear_eq(&mut self, terms: &[(f64, OracleVar)], constant: f64);

    /// Adds the constraint `target == left * right`.
    fn add_product_eq(&mut self, target: OracleVar, left: OracleVar, right: OracleVar);

    /// Selects the objective variable and direction for subsequent
    /// [`solve`](Oracle::solve) calls.
    fn set_objective(&mut self, var: OracleVar, sense: Sense);

    /// Runs the optimizer against the current constraint system.
    fn solve(&mut self) -> SolveStatus;
}
