//! Shared fixture builders for unit tests scattered across this crate's
//! `#[cfg(test)]` modules, grounded in the repeated "one product, a short
//! task chain, one team" shape every module's own tests already build by
//! hand (`metrics::tests::chain_input`, `optimizer::tests::serial_chain_input`).

use std::collections::BTreeSet;

use crate::model::{
    CoreInput, Product, RawPrecedenceEdge, Relation, Shift, Team, TeamKind, TaskTemplate,
};
use crate::time::epoch;

/// A single product (`"A"`, delivery date = epoch date) needing tasks `1..=n`
/// in strict sequence, each one minute long, all assigned to a single
/// one-person team named `team` working every shift.
pub fn sequential_chain(n: u32, team: &str) -> CoreInput {
    let mut core = CoreInput::default();
    core.products.push(Product {
        product_id: "A".into(),
        delivery_date: epoch().date(),
        incomplete_range: (1, n),
        holidays: BTreeSet::new(),
    });
    for task_num in 1..=n {
        core.task_templates.push(TaskTemplate {
            task_num,
            duration_min: 60,
            team: team.into(),
            crew: 1,
        });
        if task_num > 1 {
            core.precedence_edges.push(RawPrecedenceEdge {
                first: task_num - 1,
                second: task_num,
                relation: Relation::FinishLeqStart,
            });
        }
    }
    let mut shifts = BTreeSet::new();
    shifts.extend(Shift::ALL);
    core.mechanic_teams
        .push(Team::new(team.into(), TeamKind::Mechanic, 1, shifts));
    core
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_chain_has_n_tasks_and_n_minus_one_edges() {
        let core = sequential_chain(4, "M");
        assert_eq!(core.task_templates.len(), 4);
        assert_eq!(core.precedence_edges.len(), 3);
        assert_eq!(core.mechanic_teams.len(), 1);
    }
}
