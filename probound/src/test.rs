//! Shared helpers for unit tests.
use partial_ref::{partial, PartialRef};

use probound_model::parse_decimal;

use crate::class::ClassRegistry;
use crate::config::SolverConfig;
use crate::context::{ClassesP, Context, RulesP};
use crate::oracle::{Oracle, OracleVar, Sense, SolveStatus};
use crate::partition::connected_components;

/// Oracle double that records every call and returns a canned status.
pub struct RecordingOracle {
    pub var_names: Vec<String>,
    pub bounds: Vec<(f64, f64)>,
    pub linear: Vec<(Vec<(f64, OracleVar)>, f64)>,
    pub products: Vec<(OracleVar, OracleVar, OracleVar)>,
    pub objective: Option<(OracleVar, Sense)>,
    pub status: SolveStatus,
}

impl Default for RecordingOracle {
    fn default() -> RecordingOracle {
        RecordingOracle {
            var_names: vec![],
            bounds: vec![],
            linear: vec![],
            products: vec![],
            objective: None,
            status: SolveStatus::NumericalError,
        }
    }
}

impl Oracle for RecordingOracle {
    fn add_variable(&mut self, name: &str, lower: f64, upper: f64) -> OracleVar {
        let var = OracleVar::from_index(self.var_names.len());
        self.var_names.push(name.to_owned());
        self.bounds.push((lower, upper));
        var
    }

    fn add_linear_eq(&mut self, terms: &[(f64, OracleVar)], constant: f64) {
        self.linear.push((terms.to_vec(), constant));
    }

    fn add_product_eq(&mut self, target: OracleVar, left: OracleVar, right: OracleVar) {
        self.products.push((target, left, right));
    }

    fn set_objective(&mut self, var: OracleVar, sense: Sense) {
        self.objective = Some((var, sense));
    }

    fn solve(&mut self) -> SolveStatus {
        self.status
    }
}

/// Builds a registry directly from explicit components.
pub fn registry(oracle: &mut impl Oracle, components: &[&[&str]]) -> ClassRegistry {
    let components = components
        .iter()
        .map(|facts| facts.iter().map(|fact| (*fact).to_owned()).collect())
        .collect();
    let mut registry = ClassRegistry::default();
    registry
        .build(components, &SolverConfig::default(), oracle)
        .unwrap();
    registry
}

/// Populates the rule set with the given marginals and undirected edges,
/// then builds the correlation classes from the discovered components.
pub fn build_classes(
    mut ctx: partial!(Context, mut ClassesP, mut RulesP),
    oracle: &mut impl Oracle,
    facts: &[(&str, &str)],
    edges: &[(&str, &str)],
) {
    for (name, marginal) in facts {
        let rules = ctx.part_mut(RulesP);
        rules
            .marginals
            .insert((*name).to_owned(), parse_decimal(marginal).unwrap());
        rules.fact_order.push((*name).to_owned());
    }
    for (left, right) in edges {
        ctx.part_mut(RulesP).add_undirected_edge(left, right);
    }

    let components = connected_components(ctx.part(RulesP));
    ctx.part_mut(ClassesP)
        .build(components, &SolverConfig::default(), oracle)
        .unwrap();
}
