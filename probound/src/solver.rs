//! Probability bounds solver facade.
use log::info;
use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use num_traits::{One, Zero};
use thiserror::Error;

use probound_model::{BigRational, Problem, RuleProb};

use crate::bounds::{self, FactBounds};
use crate::config::SolverConfig;
use crate::context::{ClassesP, CompileStateP, Context, ExpressionsP, RulesP};
use crate::lower::build_constraints;
use crate::oracle::Oracle;
use crate::partition::connected_components;
use crate::rules::{FactRule, OutputRule, RuleSet};

/// Possible errors while compiling a problem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("duplicate marginal for fact '{}'", fact)]
    DuplicateFact { fact: String },
    #[error("probability {} for '{}' is outside [0, 1]", value, fact)]
    ProbabilityOutOfRange { fact: String, value: String },
    #[error(
        "rule for known fact '{}' references '{}' which has no declared marginal",
        rule,
        body_fact
    )]
    UnknownBodyFact { rule: String, body_fact: String },
    #[error("rule '{}' has an empty body", rule)]
    EmptyRuleBody { rule: String },
    #[error(
        "rule for output fact '{}' carries the unknown sentinel instead of a weight",
        rule
    )]
    UnweightedOutputRule { rule: String },
    #[error(
        "correlation class {} has {} facts, exceeding the limit of {}",
        class,
        size,
        limit
    )]
    ClassTooLarge {
        class: String,
        size: usize,
        limit: usize,
    },
    #[error("output fact '{}' participates in a rule cycle", fact)]
    CyclicRule { fact: String },
    #[error("fact '{}' is neither known nor defined by any rule", fact)]
    UndefinedFact { fact: String },
    #[error("no problem loaded")]
    NoProblem,
}

/// A probability bounds solver.
///
/// Wires the compilation pipeline to an optimization oracle: correlation
/// partitioning, joint distribution variables, constraint emission, output
/// expression construction and per-fact bounds optimization. The pipeline is
/// single threaded; phases run strictly in that order.
pub struct Solver<O> {
    oracle: O,
    ctx: Box<Context>,
    config: SolverConfig,
}

impl<O: Oracle> Solver<O> {
    /// Creates a solver on top of the given oracle.
    pub fn new(oracle: O) -> Solver<O> {
        Solver::with_config(oracle, SolverConfig::default())
    }

    /// Creates a solver with an explicit configuration.
    pub fn with_config(oracle: O, config: SolverConfig) -> Solver<O> {
        Solver {
            oracle,
            ctx: Box::new(Context::default()),
            config,
        }
    }

    /// Loads and validates a problem, then materializes the correlation
    /// classes and their joint distribution variables in the oracle.
    ///
    /// All malformed-input conditions are reported here, before any
    /// constraint is emitted.
    pub fn load_problem(&mut self, problem: &Problem) -> Result<(), CompileError> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        *ctx.part_mut(RulesP) = build_rule_set(problem)?;

        let components = connected_components(ctx.part(RulesP));
        ctx.part_mut(ClassesP)
            .build(components, &self.config, &mut self.oracle)?;

        ctx.part_mut(CompileStateP).problem_loaded = true;
        info!(
            "loaded problem: {} known facts, {} output facts, {} classes",
            ctx.part(RulesP).fact_order.len(),
            ctx.part(RulesP).output_order.len(),
            ctx.part(ClassesP).len()
        );
        Ok(())
    }

    /// Computes probability bounds for every output fact, in declaration
    /// order.
    ///
    /// Emits the constraint system on first call, then builds each output
    /// fact's expression and optimizes it twice. Oracle failures are
    /// recorded per fact in the returned [`FactBounds`]; only compilation
    /// errors abort the run.
    pub fn solve_bounds(&mut self) -> Result<Vec<FactBounds>, CompileError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        if !ctx.part(CompileStateP).problem_loaded {
            return Err(CompileError::NoProblem);
        }
        if !ctx.part(CompileStateP).constraints_emitted {
            build_constraints(ctx.borrow(), &mut self.oracle);
            ctx.part_mut(CompileStateP).constraints_emitted = true;
        }
        bounds::solve_bounds(ctx.borrow(), &mut self.oracle)
    }

    /// The fully expanded arithmetic DNF of a fact, rendered with
    /// class-qualified outcome names, for diagnostics and auditing.
    ///
    /// Available for every fact whose expression has been built.
    pub fn expression(&self, fact: &str) -> Option<String> {
        let ctx = self.ctx.into_partial_ref();
        let expr = ctx.part(ExpressionsP).get(fact)?;
        Some(expr.display(ctx.part(ClassesP)).to_string())
    }

    /// Read access to the oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

/// Validates a problem and indexes it for compilation.
fn build_rule_set(problem: &Problem) -> Result<RuleSet, CompileError> {
    let mut rules = RuleSet::default();

    for (name, marginal) in problem.facts() {
        if rules.marginals.contains_key(name) {
            return Err(CompileError::DuplicateFact {
                fact: name.to_owned(),
            });
        }
        check_probability(name, marginal)?;
        rules.marginals.insert(name.to_owned(), marginal.clone());
        rules.fact_order.push(name.to_owned());
    }

    for rule in problem.rules() {
        if rule.body.is_empty() {
            return Err(CompileError::EmptyRuleBody {
                rule: rule.source.clone(),
            });
        }
        if rules.is_known(&rule.source) {
            for body_fact in &rule.body {
                if !rules.is_known(body_fact) {
                    return Err(CompileError::UnknownBodyFact {
                        rule: rule.source.clone(),
                        body_fact: body_fact.clone(),
                    });
                }
            }
            // Every rule among known facts contributes correlation edges,
            // with or without a usable conditional probability.
            for body_fact in &rule.body {
                rules.add_undirected_edge(&rule.source, body_fact);
            }
            if let RuleProb::Prob(prob) = &rule.prob {
                check_probability(&rule.source, prob)?;
                rules.fact_rules.push(FactRule {
                    source: rule.source.clone(),
                    body: rule.body.clone(),
                    prob: prob.clone(),
                });
            }
        } else {
            let weight = match &rule.prob {
                RuleProb::Prob(weight) => weight.clone(),
                RuleProb::Unknown => {
                    return Err(CompileError::UnweightedOutputRule {
                        rule: rule.source.clone(),
                    })
                }
            };
            check_probability(&rule.source, &weight)?;
            if !rules.output_rules.contains_key(&rule.source) {
                rules.output_order.push(rule.source.clone());
            }
            rules
                .output_rules
                .entry(rule.source.clone())
                .or_default()
                .push(OutputRule {
                    body: rule.body.clone(),
                    weight,
                });
        }
    }

    Ok(rules)
}

fn check_probability(fact: &str, value: &BigRational) -> Result<(), CompileError> {
    if value < &BigRational::zero() || value > &BigRational::one() {
        return Err(CompileError::ProbabilityOutOfRange {
            fact: fact.to_owned(),
            value: value.to_string(),
        });
    }
    Ok(())
}
