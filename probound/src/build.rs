//! Building and caching fact expressions.
use std::rc::Rc;

use partial_ref::{partial, PartialRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::{ClassesP, Context, ExpressionsP, RulesP};
use crate::expr::Expr;
use crate::solver::CompileError;

/// Cache of finished fact expressions plus the in-progress marker set used
/// for cycle detection.
///
/// Expressions are built once per fact and shared; every algebra operation
/// copies, so cached expressions are never mutated.
#[derive(Default)]
pub struct ExpressionCache {
    built: FxHashMap<String, Rc<Expr>>,
    building: FxHashSet<String>,
}

impl ExpressionCache {
    /// The cached expression of a fact, if it has been built.
    pub fn get(&self, fact: &str) -> Option<Rc<Expr>> {
        self.built.get(fact).cloned()
    }

    /// Number of cached expressions.
    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}

/// Base expression of a known fact, built on first use and cached.
pub fn known_expr(
    mut ctx: partial!(Context, mut ExpressionsP, ClassesP),
    fact: &str,
) -> Rc<Expr> {
    if let Some(expr) = ctx.part(ExpressionsP).get(fact) {
        return expr;
    }

    let (classes, mut ctx) = ctx.split_part(ClassesP);
    let class_id = classes
        .class_of(fact)
        .expect("known fact without a correlation class");
    let expr = Rc::new(Expr::for_fact(fact, classes.class(class_id)));
    ctx.part_mut(ExpressionsP)
        .built
        .insert(fact.to_owned(), expr.clone());
    expr
}

/// Expression of an output fact, built recursively from its defining rules.
///
/// Per rule, the body expressions are conjoined left to right and scaled by
/// the rule weight; the scaled conjunctions are then combined with
/// probabilistic OR in rule declaration order. Recursion bottoms out at the
/// cached known-fact expressions, which the constraint compiler has already
/// built by the time this runs. A cycle among output facts is reported as
/// [`CompileError::CyclicRule`] instead of recursing unboundedly.
pub fn output_expr(
    mut ctx: partial!(Context, mut ExpressionsP, ClassesP, RulesP),
    fact: &str,
) -> Result<Rc<Expr>, CompileError> {
    if let Some(expr) = ctx.part(ExpressionsP).get(fact) {
        return Ok(expr);
    }
    if ctx.part(ExpressionsP).building.contains(fact) {
        return Err(CompileError::CyclicRule {
            fact: fact.to_owned(),
        });
    }

    let rules = match ctx.part(RulesP).output_rules.get(fact) {
        Some(rules) => rules.clone(),
        None => {
            return Err(CompileError::UndefinedFact {
                fact: fact.to_owned(),
            })
        }
    };
    ctx.part_mut(ExpressionsP).building.insert(fact.to_owned());

    let mut combined: Option<Expr> = None;
    for rule in &rules {
        let mut conjunction = (*resolve_expr(ctx.borrow(), &rule.body[0])?).clone();
        for body_fact in &rule.body[1..] {
            let next = resolve_expr(ctx.borrow(), body_fact)?;
            conjunction = conjunction.mul(&next, ctx.part(ClassesP));
        }
        let weighted = conjunction.scaled(&rule.weight);
        combined = Some(match combined {
            Some(accumulated) => accumulated.add(&weighted, ctx.part(ClassesP)),
            None => weighted,
        });
    }

    let expr = Rc::new(combined.expect("output fact with no defining rules"));
    let cache = ctx.part_mut(ExpressionsP);
    cache.building.remove(fact);
    cache.built.insert(fact.to_owned(), expr.clone());
    Ok(expr)
}

/// Expression of a fact that may be known or derived.
fn resolve_expr(
    mut ctx: partial!(Context, mut ExpressionsP, ClassesP, RulesP),
    fact: &str,
) -> Result<Rc<Expr>, CompileError> {
    if ctx.part(RulesP).is_known(fact) {
        Ok(known_expr(ctx.borrow(), fact))
    } else {
        output_expr(ctx, fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use probound_model::parse_decimal;

    use crate::rules::OutputRule;
    use crate::test::{build_classes, RecordingOracle};

    fn output_rule(body: &[&str], weight: &str) -> OutputRule {
        OutputRule {
            body: body.iter().map(|s| s.to_string()).collect(),
            weight: parse_decimal(weight).unwrap(),
        }
    }

    #[test]
    fn known_expressions_are_memoized() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(ctx.borrow(), &mut oracle, &[("a", "0.5")], &[]);

        let first = known_expr(ctx.borrow(), "a");
        let second = known_expr(ctx.borrow(), "a");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(ctx.part(ExpressionsP).len(), 1);
    }

    #[test]
    fn output_expressions_combine_rules_in_order() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(
            ctx.borrow(),
            &mut oracle,
            &[("a", "0.5"), ("b", "0.5")],
            &[],
        );
        known_expr(ctx.borrow(), "a");
        known_expr(ctx.borrow(), "b");

        let rules = ctx.part_mut(RulesP);
        rules.output_order.push("o".to_owned());
        rules.output_rules.insert(
            "o".to_owned(),
            vec![output_rule(&["a"], "0.8"), output_rule(&["b"], "0.6")],
        );

        let expr = output_expr(ctx.borrow(), "o").unwrap();
        // Spans both singleton classes: 2 * 2 monomials.
        assert_eq!(expr.term_count(), 4);
        assert_eq!(expr.classes().len(), 2);

        let again = output_expr(ctx.borrow(), "o").unwrap();
        assert!(Rc::ptr_eq(&expr, &again));
    }

    #[test]
    fn cyclic_rules_are_rejected() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(ctx.borrow(), &mut oracle, &[("a", "0.5")], &[]);
        known_expr(ctx.borrow(), "a");

        let rules = ctx.part_mut(RulesP);
        rules.output_order.push("o1".to_owned());
        rules.output_order.push("o2".to_owned());
        rules
            .output_rules
            .insert("o1".to_owned(), vec![output_rule(&["o2"], "1")]);
        rules
            .output_rules
            .insert("o2".to_owned(), vec![output_rule(&["o1"], "1")]);

        let err = output_expr(ctx.borrow(), "o1").unwrap_err();
        assert!(matches!(err, CompileError::CyclicRule { .. }));
    }

    #[test]
    fn undefined_body_facts_are_rejected() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(ctx.borrow(), &mut oracle, &[("a", "0.5")], &[]);
        known_expr(ctx.borrow(), "a");

        let rules = ctx.part_mut(RulesP);
        rules.output_order.push("o".to_owned());
        rules
            .output_rules
            .insert("o".to_owned(), vec![output_rule(&["ghost"], "1")]);

        let err = output_expr(ctx.borrow(), "o").unwrap_err();
        assert!(matches!(err, CompileError::UndefinedFact { .. }));
    }
}
