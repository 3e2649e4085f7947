//! Reference oracle based on fixpoint constraint propagation.
//!
//! This backend handles the deterministic subset of bound computations:
//! whenever the emitted constraints fully determine every variable the
//! objective depends on, forward substitution finds those values exactly
//! once and minimum and maximum coincide. Underdetermined systems — the
//! genuinely nonconvex case — are reported as
//! [`SolveStatus::NumericalError`]; a production deployment plugs a real
//! nonconvex QCQP solver into the [`Oracle`] trait instead.
use log::debug;

use crate::oracle::{Oracle, OracleVar, Sense, SolveStatus};

const TOLERANCE: f64 = 1e-6;

enum Constraint {
    Linear {
        terms: Vec<(f64, OracleVar)>,
        constant: f64,
    },
    Product {
        target: OracleVar,
        left: OracleVar,
        right: OracleVar,
    },
}

/// Forward-substitution oracle for fully determined constraint systems.
#[derive(Default)]
pub struct PropagatingOracle {
    names: Vec<String>,
    bounds: Vec<(f64, f64)>,
    constraints: Vec<Constraint>,
    objective: Option<OracleVar>,
    values: Vec<Option<f64>>,
}

impl PropagatingOracle {
    pub fn new() -> PropagatingOracle {
        PropagatingOracle::default()
    }

    /// The value a variable was determined to by the last `solve` call.
    pub fn value(&self, var: OracleVar) -> Option<f64> {
        self.values.get(var.index()).copied().flatten()
    }

    /// Runs substitution passes until no constraint determines a new value.
    ///
    /// A linear equality with exactly one unknown variable determines it; a
    /// product equality with both factors known determines its target.
    /// Propagation is forward only: products are never inverted.
    fn propagate(&self) -> Result<Vec<Option<f64>>, SolveStatus> {
        let mut values: Vec<Option<f64>> = vec![None; self.names.len()];

        loop {
            let mut changed = false;
            for constraint in &self.constraints {
                match constraint {
                    Constraint::Linear { terms, constant } => {
                        let mut known_sum = 0.0;
                        let mut unknown = None;
                        let mut unknown_count = 0;
                        for &(coeff, var) in terms {
                            match values[var.index()] {
                                Some(value) => known_sum += coeff * value,
                                None => {
                                    unknown_count += 1;
                                    unknown = Some((coeff, var));
                                }
                            }
                        }
                        match (unknown_count, unknown) {
                            (0, _) => {
                                if (known_sum - constant).abs() > TOLERANCE {
                                    return Err(SolveStatus::Infeasible);
                                }
                            }
                            (1, Some((coeff, var))) if coeff != 0.0 => {
                                let value = (constant - known_sum) / coeff;
                                self.assign(&mut values, var, value)?;
                                changed = true;
                            }
                            _ => {}
                        }
                    }
                    Constraint::Product {
                        target,
                        left,
                        right,
                    } => {
                        if let (Some(left_value), Some(right_value)) =
                            (values[left.index()], values[right.index()])
                        {
                            let product = left_value * right_value;
                            match values[target.index()] {
                                Some(existing) => {
                                    if (existing - product).abs() > TOLERANCE {
                                        return Err(SolveStatus::Infeasible);
                                    }
                                }
                                None => {
                                    self.assign(&mut values, *target, product)?;
                                    changed = true;
                                }
                            }
                        }
                    }
                }
            }
            if !changed {
                return Ok(values);
            }
        }
    }

    fn assign(
        &self,
        values: &mut [Option<f64>],
        var: OracleVar,
        value: f64,
    ) -> Result<(), SolveStatus> {
        let (lower, upper) = self.bounds[var.index()];
        if value < lower - TOLERANCE || value > upper + TOLERANCE {
            return Err(SolveStatus::Infeasible);
        }
        values[var.index()] = Some(value);
        Ok(())
    }
}

impl Oracle for PropagatingOracle {
    fn add_variable(&mut self, name: &str, lower: f64, upper: f64) -> OracleVar {
        let var = OracleVar::from_index(self.names.len());
        self.names.push(name.to_owned());
        self.bounds.push((lower, upper));
        var
    }

    fn add_linear_eq(&mut self, terms: &[(f64, OracleVar)], constant: f64) {
        self.constraints.push(Constraint::Linear {
            terms: terms.to_vec(),
            constant,
        });
    }

    fn add_product_eq(&mut self, target: OracleVar, left: OracleVar, right: OracleVar) {
        self.constraints
            .push(Constraint::Product { target, left, right });
    }

    fn set_objective(&mut self, var: OracleVar, _sense: Sense) {
        // A fully determined objective has a unique value, so the direction
        // is irrelevant here.
        self.objective = Some(var);
    }

    fn solve(&mut self) -> SolveStatus {
        let objective = match self.objective {
            Some(var) => var,
            None => return SolveStatus::NumericalError,
        };
        match self.propagate() {
            Ok(values) => {
                self.values = values;
                match self.values[objective.index()] {
                    Some(value) => SolveStatus::Optimal(value),
                    None => {
                        debug!(
                            "objective {} not determined by propagation",
                            self.names[objective.index()]
                        );
                        SolveStatus::NumericalError
                    }
                }
            }
            Err(status) => {
                self.values = vec![None; self.names.len()];
                status
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_linear_chain() {
        let mut oracle = PropagatingOracle::new();
        let x = oracle.add_variable("x", 0.0, 1.0);
        let y = oracle.add_variable("y", 0.0, 1.0);

        // x = 0.25, y = 1 - x
        oracle.add_linear_eq(&[(1.0, x)], 0.25);
        oracle.add_linear_eq(&[(1.0, x), (1.0, y)], 1.0);
        oracle.set_objective(y, Sense::Minimize);

        assert_eq!(oracle.solve(), SolveStatus::Optimal(0.75));
        assert_eq!(oracle.value(x), Some(0.25));
    }

    #[test]
    fn solves_product_chain() {
        let mut oracle = PropagatingOracle::new();
        let x = oracle.add_variable("x", 0.0, 1.0);
        let y = oracle.add_variable("y", 0.0, 1.0);
        let z = oracle.add_variable("z", 0.0, 1.0);

        oracle.add_linear_eq(&[(1.0, x)], 0.5);
        oracle.add_linear_eq(&[(1.0, y)], 0.4);
        oracle.add_product_eq(z, x, y);
        oracle.set_objective(z, Sense::Maximize);

        assert_eq!(oracle.solve(), SolveStatus::Optimal(0.2));
    }

    #[test]
    fn detects_infeasibility() {
        let mut oracle = PropagatingOracle::new();
        let x = oracle.add_variable("x", 0.0, 1.0);

        oracle.add_linear_eq(&[(1.0, x)], 0.25);
        oracle.add_linear_eq(&[(1.0, x)], 0.75);
        oracle.set_objective(x, Sense::Minimize);

        assert_eq!(oracle.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn rejects_out_of_bounds_values() {
        let mut oracle = PropagatingOracle::new();
        let x = oracle.add_variable("x", 0.0, 1.0);

        oracle.add_linear_eq(&[(1.0, x)], 1.5);
        oracle.set_objective(x, Sense::Minimize);

        assert_eq!(oracle.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn reports_underdetermined_systems() {
        let mut oracle = PropagatingOracle::new();
        let x = oracle.add_variable("x", 0.0, 1.0);
        let y = oracle.add_variable("y", 0.0, 1.0);

        // One equation, two unknowns.
        oracle.add_linear_eq(&[(1.0, x), (1.0, y)], 1.0);
        oracle.set_objective(x, Sense::Minimize);

        assert_eq!(oracle.solve(), SolveStatus::NumericalError);
    }
}
