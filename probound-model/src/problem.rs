//! Facts, rules and the problem input container.
use num_rational::BigRational;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// Probability annotation carried by a rule.
///
/// Rules whose source is a known fact carry a conditional probability; rules
/// defining an output fact carry an unconditional weight. In both cases the
/// value is an exact rational. [`RuleProb::Unknown`] is the sentinel used for
/// rules that only declare that their facts are correlated, without supplying
/// the actual conditional probability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleProb {
    Prob(BigRational),
    Unknown,
}

impl RuleProb {
    /// The exact probability, if one was supplied.
    pub fn value(&self) -> Option<&BigRational> {
        match self {
            RuleProb::Prob(value) => Some(value),
            RuleProb::Unknown => None,
        }
    }
}

/// A single dependency rule `source ← body` with a probability annotation.
///
/// The body is a nonempty ordered conjunction of fact identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub source: String,
    pub body: Vec<String>,
    pub prob: RuleProb,
}

impl Rule {
    /// Create a rule with an explicit probability.
    pub fn new(
        source: impl Into<String>,
        body: impl IntoIterator<Item = impl Into<String>>,
        prob: BigRational,
    ) -> Rule {
        Rule {
            source: source.into(),
            body: body.into_iter().map(Into::into).collect(),
            prob: RuleProb::Prob(prob),
        }
    }

    /// Create an evidence-only rule (probability unknown).
    pub fn evidence(
        source: impl Into<String>,
        body: impl IntoIterator<Item = impl Into<String>>,
    ) -> Rule {
        Rule {
            source: source.into(),
            body: body.into_iter().map(Into::into).collect(),
            prob: RuleProb::Unknown,
        }
    }

    /// Create a rule with weight 1.
    pub fn certain(
        source: impl Into<String>,
        body: impl IntoIterator<Item = impl Into<String>>,
    ) -> Rule {
        Rule {
            source: source.into(),
            body: body.into_iter().map(Into::into).collect(),
            prob: RuleProb::Prob(BigRational::one()),
        }
    }
}

/// A probabilistic dependency graph problem.
///
/// Holds the declared marginal probabilities of the known facts and the list
/// of dependency rules. A fact is known iff it appears in the marginal table;
/// this is the sole discriminator between known and output facts. Both facts
/// and rules keep their insertion order, which fixes correlation class
/// discovery order and output rule combination order downstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Problem {
    facts: Vec<(String, BigRational)>,
    rules: Vec<Rule>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Problem {
        Problem::default()
    }

    /// Declare a known fact with its marginal probability.
    pub fn add_fact(&mut self, name: impl Into<String>, marginal: BigRational) {
        self.facts.push((name.into(), marginal));
    }

    /// Append a dependency rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Number of known facts.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Iterator over the known facts and their marginals, in declaration order.
    pub fn facts(&self) -> impl Iterator<Item = (&str, &BigRational)> {
        self.facts
            .iter()
            .map(|(name, marginal)| (name.as_str(), marginal))
    }

    /// Iterator over all rules, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Whether the given identifier is a known fact.
    pub fn is_known(&self, name: &str) -> bool {
        self.facts.iter().any(|(fact, _)| fact == name)
    }
}
