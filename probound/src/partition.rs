//! Correlation partitioning.
//!
//! Groups the known facts into connected components of the undirected
//! closure of all declared rule edges. Every rule among known facts
//! contributes its edges, whether or not it carries a conditional
//! probability.
use rustc_hash::FxHashSet;

use crate::rules::RuleSet;

/// Connected components of the known facts, in first-discovery order.
///
/// Facts without any edge form singleton components. Component member order
/// is depth-first discovery order, which downstream fixes the bit positions
/// within each correlation class.
pub fn connected_components(rules: &RuleSet) -> Vec<Vec<String>> {
    let mut visited = FxHashSet::default();
    let mut components = Vec::new();

    for fact in &rules.fact_order {
        if visited.contains(fact) {
            continue;
        }
        visited.insert(fact.clone());

        let mut component = Vec::new();
        let mut stack = vec![fact.clone()];
        while let Some(current) = stack.pop() {
            if let Some(neighbors) = rules.undirected.get(&current) {
                // reversed so the first declared neighbor is visited first
                for neighbor in neighbors.iter().rev() {
                    if visited.insert(neighbor.clone()) {
                        stack.push(neighbor.clone());
                    }
                }
            }
            component.push(current);
        }
        components.push(component);
    }

    components
}
