//! The arithmetic-DNF expression algebra.
//!
//! An expression represents an event's probability as a coefficient-weighted
//! sum over sets of joint outcome variables. The algebra stays exact: all
//! coefficients are arbitrary-precision rationals, and every operation
//! returns a fresh expression.
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;

use crate::class::{ClassId, ClassRegistry, CorrelationClass, JointVar};

/// An immutable set of joint variables multiplied together, one term of an
/// arithmetic DNF.
///
/// Stored as a vector sorted by class id; a monomial contains at most one
/// joint variable per correlation class. Sorting makes structurally equal
/// monomials compare and hash equal without relying on a native hashable
/// set type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Monomial {
    vars: Vec<JointVar>,
}

impl Monomial {
    /// Monomial consisting of a single joint variable.
    pub fn unit(var: JointVar) -> Monomial {
        Monomial { vars: vec![var] }
    }

    /// Copy of this monomial with one more joint variable.
    ///
    /// The new variable's class must not already occur in this monomial.
    pub fn extended(&self, var: JointVar) -> Monomial {
        debug_assert!(self.vars.iter().all(|present| present.class() != var.class()));
        let mut vars = self.vars.clone();
        let at = match vars.binary_search(&var) {
            Ok(at) | Err(at) => at,
        };
        vars.insert(at, var);
        Monomial { vars }
    }

    /// The joint variables of this monomial, sorted by class id.
    pub fn vars(&self) -> &[JointVar] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// An arithmetic DNF: a finite map from monomials to exact coefficients.
///
/// Invariant: all monomials of one expression share the same signature, the
/// set of correlation classes they reference, tracked in `classes`.
/// Zero-coefficient terms are kept so that the key sets of two mutually
/// normalized expressions coincide exactly; every consumer skips them.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    terms: FxHashMap<Monomial, BigRational>,
    classes: BTreeSet<ClassId>,
}

impl Expr {
    /// Base expression for the event "`fact` is true", within its class's
    /// joint space.
    ///
    /// One monomial per outcome of the class, coefficient 1 where the fact's
    /// bit is set and 0 elsewhere.
    pub fn for_fact(fact: &str, class: &CorrelationClass) -> Expr {
        let position = class
            .position_of(fact)
            .expect("fact does not belong to this correlation class");

        let mut terms = FxHashMap::default();
        for var in class.joint_vars() {
            let coeff = if class.fact_bit(var.bits(), position) {
                BigRational::one()
            } else {
                BigRational::zero()
            };
            terms.insert(Monomial::unit(var), coeff);
        }

        let mut classes = BTreeSet::new();
        classes.insert(class.id());
        Expr { terms, classes }
    }

    /// The correlation classes referenced by this expression.
    pub fn classes(&self) -> &BTreeSet<ClassId> {
        &self.classes
    }

    /// Number of monomials, including zero-coefficient ones.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Iterator over all terms, in hash map order.
    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    /// Terms with a nonzero coefficient, in a deterministic order.
    pub fn nonzero_terms_sorted(&self) -> Vec<(&Monomial, &BigRational)> {
        let mut terms: Vec<_> = self
            .terms
            .iter()
            .filter(|(_, coeff)| !coeff.is_zero())
            .collect();
        terms.sort_by(|a, b| a.0.cmp(b.0));
        terms
    }

    /// This expression lifted into the joint space of `other`.
    ///
    /// For every class referenced by `other` but not by `self`, every
    /// monomial is replaced by its cross product with all outcomes of that
    /// class, carrying the coefficient unchanged. This is exact because the
    /// added class's outcomes partition probability 1, so lifting preserves
    /// the expression's value while making the two operands' monomial
    /// signatures match. Returns the expression unchanged when no class is
    /// missing.
    pub fn normalized<'a>(&'a self, other: &Expr, registry: &ClassRegistry) -> Cow<'a, Expr> {
        let missing: Vec<ClassId> = other.classes.difference(&self.classes).copied().collect();
        if missing.is_empty() {
            return Cow::Borrowed(self);
        }

        let mut terms = self.terms.clone();
        for &class_id in &missing {
            let class = registry.class(class_id);
            let mut expanded = FxHashMap::with_capacity_and_hasher(
                terms.len() * class.outcome_count(),
                Default::default(),
            );
            for (monomial, coeff) in &terms {
                for var in class.joint_vars() {
                    expanded.insert(monomial.extended(var), coeff.clone());
                }
            }
            terms = expanded;
        }

        let mut classes = self.classes.clone();
        classes.extend(missing);
        Cow::Owned(Expr { terms, classes })
    }

    /// Probabilistic OR of two not-necessarily-disjoint events.
    ///
    /// Both operands are normalized against each other; matched coefficients
    /// combine as `c1 + c2 - c1*c2`. Each coefficient is itself a
    /// probability conditioned on the shared, mutually exclusive joint
    /// outcome, so OR reduces to `1 - (1-c1)(1-c2)` expanded.
    pub fn add(&self, other: &Expr, registry: &ClassRegistry) -> Expr {
        let lhs = self.normalized(other, registry);
        let rhs = other.normalized(self, registry);
        combine(&lhs, &rhs, |c1, c2| c1 + c2 - c1 * c2)
    }

    /// Probabilistic AND; matched coefficients multiply.
    pub fn mul(&self, other: &Expr, registry: &ClassRegistry) -> Expr {
        let lhs = self.normalized(other, registry);
        let rhs = other.normalized(self, registry);
        combine(&lhs, &rhs, |c1, c2| c1 * c2)
    }

    /// Every coefficient scaled by a constant; the signature is unchanged.
    pub fn scaled(&self, factor: &BigRational) -> Expr {
        let terms = self
            .terms
            .iter()
            .map(|(monomial, coeff)| (monomial.clone(), coeff * factor))
            .collect();
        Expr {
            terms,
            classes: self.classes.clone(),
        }
    }

    /// Adapter rendering the expression with class-qualified outcome names.
    pub fn display<'a>(&'a self, registry: &'a ClassRegistry) -> ExprDisplay<'a> {
        ExprDisplay {
            expr: self,
            registry,
        }
    }
}

/// Combines two mutually normalized expressions term by term.
///
/// The key sets must coincide after normalization; divergence is an algebra
/// implementation bug, not a user error, and fails loudly.
fn combine(
    lhs: &Expr,
    rhs: &Expr,
    op: impl Fn(&BigRational, &BigRational) -> BigRational,
) -> Expr {
    assert_eq!(
        lhs.terms.len(),
        rhs.terms.len(),
        "normalized expressions have diverging monomial sets"
    );
    let terms = lhs
        .terms
        .iter()
        .map(|(monomial, c1)| {
            let c2 = rhs
                .terms
                .get(monomial)
                .expect("normalized expressions have diverging monomial sets");
            (monomial.clone(), op(c1, c2))
        })
        .collect();
    Expr {
        terms,
        classes: lhs.classes.clone(),
    }
}

/// Displays an expression as `c*V0_1*V1_01 + …`, skipping zero terms.
pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    registry: &'a ClassRegistry,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (monomial, coeff) in self.expr.nonzero_terms_sorted() {
            if !first {
                f.write_str(" + ")?;
            }
            first = false;
            write!(f, "{}", coeff)?;
            for &var in monomial.vars() {
                write!(f, "*{}", self.registry.var_name(var))?;
            }
        }
        Ok(())
    }
}
