//! Lowering classes and expressions into oracle constraints.
use log::debug;
use partial_ref::{partial, PartialRef};

use probound_model::to_f64;

use crate::build::known_expr;
use crate::context::{AuxAllocP, ClassesP, Context, ExpressionsP, RulesP};
use crate::expr::Expr;
use crate::oracle::{Oracle, OracleVar};
use crate::rules::FactRule;

/// Allocator for the auxiliary `[0,1]` variables introduced by lowering.
///
/// Auxiliary variables are numbered sequentially and never reused.
#[derive(Default)]
pub struct AuxAllocator {
    count: usize,
}

impl AuxAllocator {
    /// Creates a fresh auxiliary variable, bounded to `[0, 1]`.
    pub fn fresh(&mut self, oracle: &mut impl Oracle) -> OracleVar {
        let var = oracle.add_variable(&format!("aux{}", self.count), 0.0, 1.0);
        self.count += 1;
        var
    }

    /// Number of auxiliary variables created so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Lowers an expression into oracle constraints, returning one variable per
/// nonzero monomial whose sum equals the expression's value.
///
/// Each monomial becomes a left-fold chain of auxiliary variables: the first
/// link carries `coefficient * var` as a linear equality, each further link
/// multiplies the previous link by the next joint variable as a binary
/// product equality. Every emitted constraint therefore has degree at most
/// two, the class the oracle accepts. Monomials are independent, so chains
/// never merge. Calling this twice for the same expression emits two
/// independent constraint sets; constraint count is traded for simplicity.
pub fn lower_sum<O: Oracle>(
    mut ctx: partial!(Context, mut AuxAllocP, ClassesP),
    oracle: &mut O,
    expr: &Expr,
) -> Vec<OracleVar> {
    let (classes, mut ctx) = ctx.split_part(ClassesP);
    let aux = ctx.part_mut(AuxAllocP);

    let mut chain_ends = Vec::new();
    for (monomial, coeff) in expr.nonzero_terms_sorted() {
        let mut vars = monomial.vars().iter();
        let first = vars
            .next()
            .expect("monomial without joint variables");

        let head = aux.fresh(oracle);
        let first_var = classes.class(first.class()).oracle_var(first.bits());
        oracle.add_linear_eq(&[(1.0, head), (-to_f64(coeff), first_var)], 0.0);

        let mut acc = head;
        for var in vars {
            let next = aux.fresh(oracle);
            let oracle_var = classes.class(var.class()).oracle_var(var.bits());
            oracle.add_product_eq(next, acc, oracle_var);
            acc = next;
        }
        chain_ends.push(acc);
    }
    chain_ends
}

/// Emits the complete constraint system for the ingested problem.
///
/// Order: unit sums per class, marginal matches per known fact, dependency
/// matches per conditional rule. As a side effect the marginal pass caches
/// the base expression of every known fact, which the output expression
/// builder relies on afterwards.
pub fn build_constraints<O: Oracle>(
    mut ctx: partial!(Context, mut AuxAllocP, mut ExpressionsP, ClassesP, RulesP),
    oracle: &mut O,
) {
    add_unit_sum_constraints(ctx.borrow(), oracle);
    add_marginal_constraints(ctx.borrow(), oracle);
    add_dependency_constraints(ctx.borrow(), oracle);
}

/// Per class: the sum of all joint variables equals 1, making the class's
/// outcomes a complete, mutually exclusive distribution.
fn add_unit_sum_constraints(ctx: partial!(Context, ClassesP), oracle: &mut impl Oracle) {
    for class in ctx.part(ClassesP).classes() {
        let terms: Vec<(f64, OracleVar)> = (0..class.outcome_count())
            .map(|bits| (1.0, class.oracle_var(bits as u32)))
            .collect();
        oracle.add_linear_eq(&terms, 1.0);
    }
}

/// Per known fact: the sum of the joint variables with the fact's bit set
/// equals the declared marginal.
fn add_marginal_constraints(
    mut ctx: partial!(Context, mut ExpressionsP, ClassesP, RulesP),
    oracle: &mut impl Oracle,
) {
    let fact_order = ctx.part(RulesP).fact_order.clone();
    for fact in fact_order {
        let expr = known_expr(ctx.borrow(), &fact);
        let marginal = ctx
            .part(RulesP)
            .marginals
            .get(&fact)
            .cloned()
            .expect("marginal constraint for unknown fact");

        let classes = ctx.part(ClassesP);
        let terms: Vec<(f64, OracleVar)> = expr
            .nonzero_terms_sorted()
            .iter()
            .map(|(monomial, _)| {
                let var = monomial.vars()[0];
                (1.0, classes.class(var.class()).oracle_var(var.bits()))
            })
            .collect();
        oracle.add_linear_eq(&terms, to_f64(&marginal));
    }
}

/// Per conditional rule `f ← body, p` among known facts: enforces
/// `P(f ∧ body) = p · P(body)` through a bridging auxiliary variable
/// equated to both lowered sums.
fn add_dependency_constraints(
    mut ctx: partial!(Context, mut AuxAllocP, mut ExpressionsP, ClassesP, RulesP),
    oracle: &mut impl Oracle,
) {
    let rules: Vec<FactRule> = ctx.part(RulesP).fact_rules.clone();
    for rule in rules {
        let source_expr = known_expr(ctx.borrow(), &rule.source);
        let mut body_expr = (*known_expr(ctx.borrow(), &rule.body[0])).clone();
        for fact in &rule.body[1..] {
            let next = known_expr(ctx.borrow(), fact);
            body_expr = body_expr.mul(&next, ctx.part(ClassesP));
        }
        let joint_expr = source_expr.mul(&body_expr, ctx.part(ClassesP));

        let joint_terms = lower_sum(ctx.borrow(), oracle, &joint_expr);
        let scaled_body = body_expr.scaled(&rule.prob);
        let body_terms = lower_sum(ctx.borrow(), oracle, &scaled_body);

        let bridge = ctx.part_mut(AuxAllocP).fresh(oracle);
        let mut eq: Vec<(f64, OracleVar)> = vec![(1.0, bridge)];
        eq.extend(joint_terms.iter().map(|&var| (-1.0, var)));
        oracle.add_linear_eq(&eq, 0.0);

        let mut eq: Vec<(f64, OracleVar)> = vec![(1.0, bridge)];
        eq.extend(body_terms.iter().map(|&var| (-1.0, var)));
        oracle.add_linear_eq(&eq, 0.0);

        debug!(
            "dependency constraint: {} ← {} @ {}",
            rule.source,
            rule.body.join(";"),
            rule.prob
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::test::{build_classes, RecordingOracle};

    #[test]
    fn unit_sum_per_class() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(
            ctx.borrow(),
            &mut oracle,
            &[("a", "0.5"), ("b", "0.5")],
            &[],
        );

        add_unit_sum_constraints(ctx.borrow(), &mut oracle);

        assert_eq!(oracle.linear.len(), 2);
        for (terms, constant) in &oracle.linear {
            assert_eq!(terms.len(), 2);
            assert_eq!(*constant, 1.0);
        }
    }

    #[test]
    fn marginal_sums_bits_set() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(
            ctx.borrow(),
            &mut oracle,
            &[("a", "0.25"), ("b", "0.75")],
            &[("a", "b")],
        );

        add_marginal_constraints(ctx.borrow(), &mut oracle);

        // One constraint per fact, each summing the 2 outcomes (of 4) where
        // the fact's bit is set.
        assert_eq!(oracle.linear.len(), 2);
        assert_eq!(oracle.linear[0].0.len(), 2);
        assert_eq!(oracle.linear[0].1, 0.25);
        assert_eq!(oracle.linear[1].1, 0.75);
    }

    #[test]
    fn lower_sum_chains_cross_class_monomials() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(
            ctx.borrow(),
            &mut oracle,
            &[("a", "0.5"), ("b", "0.5")],
            &[],
        );

        let a = known_expr(ctx.borrow(), "a");
        let b = known_expr(ctx.borrow(), "b");
        let product = a.mul(&b, ctx.part(ClassesP));

        let baseline_linear = oracle.linear.len();
        let chain_ends = lower_sum(ctx.borrow(), &mut oracle, &product);

        // Only the both-true monomial is nonzero; its chain is one linear
        // head link plus one product link.
        assert_eq!(chain_ends.len(), 1);
        assert_eq!(oracle.linear.len() - baseline_linear, 1);
        assert_eq!(oracle.products.len(), 1);
        assert_eq!(ctx.part(AuxAllocP).count(), 2);

        // Lowering again emits an independent constraint set.
        lower_sum(ctx.borrow(), &mut oracle, &product);
        assert_eq!(oracle.products.len(), 2);
        assert_eq!(ctx.part(AuxAllocP).count(), 4);
    }

    #[test]
    fn dependency_constraints_bridge_both_sums() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        let mut oracle = RecordingOracle::default();
        build_classes(
            ctx.borrow(),
            &mut oracle,
            &[("a", "0.5"), ("b", "0.4")],
            &[("b", "a")],
        );
        ctx.part_mut(RulesP).fact_rules.push(FactRule {
            source: "b".to_owned(),
            body: vec!["a".to_owned()],
            prob: probound_model::parse_decimal("0.9").unwrap(),
        });

        add_dependency_constraints(ctx.borrow(), &mut oracle);

        // Joint expression has one nonzero monomial (a∧b), the scaled body
        // two (a true, b either); each contributes a linear head link, plus
        // the two bridge equalities.
        assert_eq!(oracle.products.len(), 0);
        assert_eq!(oracle.linear.len(), 5);
    }
}
