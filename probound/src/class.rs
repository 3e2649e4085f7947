//! Correlation classes and their joint distribution model.
//!
//! Each correlation class of n facts owns one oracle variable per joint
//! outcome, 2^n in total. This exponential blow-up is the dominant scaling
//! cost of the whole engine: it is bounded by
//! [`SolverConfig::max_class_size`](crate::config::SolverConfig) and logged
//! rather than hidden.
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::config::SolverConfig;
use crate::oracle::{Oracle, OracleVar};
use crate::solver::CompileError;

/// Index of a correlation class within the registry.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct ClassId {
    index: u32,
}

impl ClassId {
    /// Creates a class id from a 0-based index.
    #[inline]
    pub fn from_index(index: usize) -> ClassId {
        ClassId {
            index: index as u32,
        }
    }

    /// The 0-based index of this class.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// One joint outcome of a correlation class.
///
/// `bits` encodes a full truth assignment over the class's facts: the fact
/// at position i corresponds to bit i counted from the most significant end
/// of the class's bit width, matching the rendered outcome names. Ordered by
/// class first, which keeps monomials sorted by class id.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct JointVar {
    class: ClassId,
    bits: u32,
}

impl JointVar {
    pub fn new(class: ClassId, bits: u32) -> JointVar {
        JointVar { class, bits }
    }

    pub fn class(self) -> ClassId {
        self.class
    }

    pub fn bits(self) -> u32 {
        self.bits
    }
}

/// A maximal connected group of known facts whose joint distribution is
/// modeled explicitly.
///
/// Fact order is discovery order from the partitioner and fixes each fact's
/// bit position. Immutable once constructed.
pub struct CorrelationClass {
    id: ClassId,
    name: String,
    facts: Vec<String>,
    positions: FxHashMap<String, u32>,
    outcomes: Vec<OracleVar>,
}

impl CorrelationClass {
    fn new(id: ClassId, facts: Vec<String>, oracle: &mut impl Oracle) -> CorrelationClass {
        let name = format!("V{}", id.index());
        let width = facts.len();

        let mut positions = FxHashMap::default();
        for (position, fact) in facts.iter().enumerate() {
            positions.insert(fact.clone(), position as u32);
        }

        let mut outcomes = Vec::with_capacity(1 << width);
        for bits in 0..(1u32 << width) {
            let outcome_name = format!("{}_{:0width$b}", name, bits, width = width);
            outcomes.push(oracle.add_variable(&outcome_name, 0.0, 1.0));
        }

        CorrelationClass {
            id,
            name,
            facts,
            positions,
            outcomes,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of facts in this class.
    pub fn size(&self) -> usize {
        self.facts.len()
    }

    /// Member facts in bit-position order.
    pub fn facts(&self) -> &[String] {
        &self.facts
    }

    /// Number of joint outcomes, `2^size`.
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Bit position of a fact within this class.
    pub fn position_of(&self, fact: &str) -> Option<u32> {
        self.positions.get(fact).copied()
    }

    /// Whether the fact at `position` is true in the outcome `bits`.
    pub fn fact_bit(&self, bits: u32, position: u32) -> bool {
        let shift = self.size() as u32 - 1 - position;
        bits >> shift & 1 == 1
    }

    /// All joint outcomes of this class.
    pub fn joint_vars(&self) -> impl Iterator<Item = JointVar> + '_ {
        let id = self.id;
        (0..self.outcomes.len() as u32).map(move |bits| JointVar::new(id, bits))
    }

    /// The joint outcomes in which the given fact is true.
    pub fn joint_vars_with_fact(&self, fact: &str) -> Vec<JointVar> {
        match self.position_of(fact) {
            Some(position) => self
                .joint_vars()
                .filter(|var| self.fact_bit(var.bits(), position))
                .collect(),
            None => vec![],
        }
    }

    /// The oracle variable backing the outcome `bits`.
    pub fn oracle_var(&self, bits: u32) -> OracleVar {
        self.outcomes[bits as usize]
    }

    /// Class-qualified outcome name like `V0_01`.
    pub fn outcome_name(&self, bits: u32) -> String {
        format!("{}_{:0width$b}", self.name, bits, width = self.size())
    }
}

/// All correlation classes of a compilation, created once after ingestion.
#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<CorrelationClass>,
    fact_to_class: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Materializes one class per partition cell, creating the joint
    /// distribution variables in the oracle.
    ///
    /// Cells must form a partition of the known facts; names are assigned in
    /// first-discovery order.
    pub fn build(
        &mut self,
        components: Vec<Vec<String>>,
        config: &SolverConfig,
        oracle: &mut impl Oracle,
    ) -> Result<(), CompileError> {
        for facts in components {
            let id = ClassId::from_index(self.classes.len());
            // Outcome indices are u32, so at most 31 facts fit a class no
            // matter how high the configured limit is raised.
            let limit = config.max_class_size.min(31);
            if facts.len() > limit {
                return Err(CompileError::ClassTooLarge {
                    class: format!("V{}", id.index()),
                    size: facts.len(),
                    limit,
                });
            }
            if facts.len() > config.warn_class_size {
                warn!(
                    "correlation class V{} has {} facts ({} joint variables)",
                    id.index(),
                    facts.len(),
                    1u64 << facts.len()
                );
            }

            for fact in &facts {
                self.fact_to_class.insert(fact.clone(), id);
            }
            let class = CorrelationClass::new(id, facts, oracle);
            debug!(
                "class {}: {} facts, {} joint variables",
                class.name(),
                class.size(),
                class.outcome_count()
            );
            self.classes.push(class);
        }

        info!(
            "{} correlation classes, {} joint variables total",
            self.classes.len(),
            self.joint_var_count()
        );
        Ok(())
    }

    pub fn class(&self, id: ClassId) -> &CorrelationClass {
        &self.classes[id.index()]
    }

    /// Class containing the given known fact.
    pub fn class_of(&self, fact: &str) -> Option<ClassId> {
        self.fact_to_class.get(fact).copied()
    }

    /// All classes, in id order.
    pub fn classes(&self) -> impl Iterator<Item = &CorrelationClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total number of joint variables across all classes.
    pub fn joint_var_count(&self) -> usize {
        self.classes.iter().map(CorrelationClass::outcome_count).sum()
    }

    /// Rendered name of a joint variable, like `V1_010`.
    pub fn var_name(&self, var: JointVar) -> String {
        self.class(var.class()).outcome_name(var.bits())
    }
}
