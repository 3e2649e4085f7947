//! Objective construction and per-fact bounds optimization.
use log::info;
use partial_ref::{partial, PartialRef};
use serde::{Deserialize, Serialize};

use crate::build::output_expr;
use crate::context::{AuxAllocP, ClassesP, Context, ExpressionsP, RulesP};
use crate::lower::lower_sum;
use crate::oracle::{Oracle, Sense, SolveStatus};
use crate::solver::CompileError;

/// Probability bounds computed for one output fact.
///
/// Each direction carries its own status: a non-optimal oracle outcome for
/// one fact never aborts the others.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactBounds {
    pub fact: String,
    pub min: SolveStatus,
    pub max: SolveStatus,
}

/// Builds the objective for every output fact and optimizes it twice.
///
/// Output facts are processed in declaration order. The state read by one
/// fact's pair of minimize/maximize calls is not mutated by another fact's,
/// so the loop order does not affect results.
pub(crate) fn solve_bounds<O: Oracle>(
    mut ctx: partial!(Context, mut AuxAllocP, mut ExpressionsP, ClassesP, RulesP),
    oracle: &mut O,
) -> Result<Vec<FactBounds>, CompileError> {
    let output_order = ctx.part(RulesP).output_order.clone();
    let mut results = Vec::with_capacity(output_order.len());

    for fact in output_order {
        let expr = output_expr(ctx.borrow(), &fact)?;
        let chain_ends = lower_sum(ctx.borrow(), oracle, &expr);

        let objective = oracle.add_variable(&format!("obj_{}", fact), 0.0, 1.0);
        let mut eq = vec![(1.0, objective)];
        eq.extend(chain_ends.iter().map(|&var| (-1.0, var)));
        oracle.add_linear_eq(&eq, 0.0);

        oracle.set_objective(objective, Sense::Minimize);
        let min = oracle.solve();
        oracle.set_objective(objective, Sense::Maximize);
        let max = oracle.solve();
        info!("bounds for {}: min {:?}, max {:?}", fact, min, max);

        results.push(FactBounds { fact, min, max });
    }

    Ok(results)
}
