//! Indexed form of an ingested problem.
use probound_model::BigRational;

use rustc_hash::FxHashMap;

/// A conditional rule `source ← body` between known facts.
///
/// Recorded only for rules that carry an actual conditional probability;
/// evidence-only rules contribute to the undirected closure but produce no
/// dependency constraint.
#[derive(Clone, Debug)]
pub struct FactRule {
    pub source: String,
    pub body: Vec<String>,
    pub prob: BigRational,
}

/// One defining rule of an output fact: a weighted conjunctive body.
#[derive(Clone, Debug)]
pub struct OutputRule {
    pub body: Vec<String>,
    pub weight: BigRational,
}

/// The validated problem, indexed for compilation.
///
/// Built once during problem loading and read-only afterwards. `fact_order`
/// and `output_order` preserve declaration order; correlation class
/// discovery and output rule combination iterate over them, never over the
/// hash maps.
#[derive(Default)]
pub struct RuleSet {
    pub marginals: FxHashMap<String, BigRational>,
    pub fact_order: Vec<String>,
    pub undirected: FxHashMap<String, Vec<String>>,
    pub fact_rules: Vec<FactRule>,
    pub output_rules: FxHashMap<String, Vec<OutputRule>>,
    pub output_order: Vec<String>,
}

impl RuleSet {
    /// Whether the given identifier is a known fact.
    pub fn is_known(&self, fact: &str) -> bool {
        self.marginals.contains_key(fact)
    }

    /// Records an undirected correlation edge between two known facts.
    pub fn add_undirected_edge(&mut self, a: &str, b: &str) {
        self.undirected
            .entry(a.to_owned())
            .or_default()
            .push(b.to_owned());
        self.undirected
            .entry(b.to_owned())
            .or_default()
            .push(a.to_owned());
    }
}
