//! Priority keys and slack computation.
//!
//! Critical-path remainder is precomputed once per run in reverse
//! topological order rather than recursed with memoization: the dependency
//! graph is already acyclic and topologically ordered by the time this
//! runs, so a single reverse pass suffices and avoids unbounded stack depth
//! on long chains.

use std::collections::HashMap;

use chrono::NaiveDate;
use qtty::{Minute, Quantity};

use crate::dependency_graph::DependencyGraph;
use crate::model::{CoreInput, NodeKey, TaskInstance, TaskKind};

/// Fixed priority bands for non-Production kinds; smaller sorts earlier.
const LATE_PART_PRIORITY: f64 = -2000.0;
const QUALITY_INSPECTION_PRIORITY: f64 = -1000.0;
const REWORK_PRIORITY: f64 = -500.0;

/// Duration-weighted longest path from each node to any terminal of the
/// dynamic graph, keyed by [`NodeKey`].
pub fn critical_path_remainder(
    graph: &DependencyGraph,
    instances: &HashMap<NodeKey, TaskInstance>,
    reverse_topo: &[NodeKey],
) -> HashMap<NodeKey, f64> {
    let mut remainder: HashMap<NodeKey, f64> = HashMap::new();
    for &node in reverse_topo {
        let own_duration = instances.get(&node).map(|i| i.duration_min as f64).unwrap_or(0.0);
        let best_successor = graph
            .successors(node)
            .into_iter()
            .map(|s| remainder.get(&s).copied().unwrap_or(0.0))
            .fold(0.0_f64, f64::max);
        remainder.insert(node, own_duration + best_successor);
    }
    remainder
}

/// Computes the priority key for `node`. `now` is the fixed scheduling
/// epoch: earliest is always derived from it, never a moving cursor.
pub fn priority_of(
    node: NodeKey,
    instance: &TaskInstance,
    input: &CoreInput,
    graph: &DependencyGraph,
    critical_path: &HashMap<NodeKey, f64>,
    now: NaiveDate,
) -> f64 {
    match instance.kind {
        TaskKind::LatePart => LATE_PART_PRIORITY,
        TaskKind::QualityInspection => QUALITY_INSPECTION_PRIORITY,
        TaskKind::Rework => REWORK_PRIORITY,
        TaskKind::Production => {
            let days_to_delivery = input
                .product_by_index(node.product)
                .map(|p| (p.delivery_date - now).num_days() as f64)
                .unwrap_or(0.0);
            let remainder = critical_path.get(&node).copied().unwrap_or(0.0);
            let out_degree = graph.out_degree(node) as f64;
            let duration = instance.duration_min as f64;

            (100.0 - days_to_delivery) * 10.0
                + (10000.0 - remainder) * 5.0
                + (100.0 - out_degree) * 3.0
                + (100.0 - duration / 10.0) * 2.0
        }
    }
}

/// Slack in hours for a scheduled instance: the sum of all transitive
/// successor durations, converted to calendar days at 8 h/day (this figure
/// is inconsistent with the 8.5 h shift length, but is kept as-is since
/// downstream consumers depend on it), two buffer days added, slack
/// measured against the scheduled start.
pub fn slack_hours(
    node: NodeKey,
    scheduled_start: Option<Quantity<Minute>>,
    input: &CoreInput,
    graph: &DependencyGraph,
    instances: &HashMap<NodeKey, TaskInstance>,
    clock: &crate::time::Clock,
) -> f64 {
    const HOURS_PER_DAY: f64 = 8.0;

    let Some(start) = scheduled_start else {
        return f64::INFINITY;
    };
    let Some(product) = input.product_by_index(node.product) else {
        return f64::INFINITY;
    };

    let total_successor_minutes = transitive_successor_duration(node, graph, instances);
    let buffer_days = total_successor_minutes / 60.0 / HOURS_PER_DAY;
    let latest_start_date = product.delivery_date - chrono::Duration::days((buffer_days + 2.0).ceil() as i64);
    let latest_start = clock.to_axis(latest_start_date.and_hms_opt(6, 0, 0).unwrap());

    (latest_start.value() - start.value()) / 60.0
}

fn transitive_successor_duration(
    node: NodeKey,
    graph: &DependencyGraph,
    instances: &HashMap<NodeKey, TaskInstance>,
) -> f64 {
    let mut stack = graph.successors(node);
    let mut visited = std::collections::HashSet::new();
    let mut total = 0.0;
    while let Some(n) = stack.pop() {
        if !visited.insert(n) {
            continue;
        }
        if let Some(instance) = instances.get(&n) {
            total += instance.duration_min as f64;
        }
        stack.extend(graph.successors(n));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance_builder;
    use crate::model::*;
    use std::collections::BTreeSet;

    fn chain_input() -> CoreInput {
        let mut input = CoreInput::default();
        input.products.push(Product {
            product_id: "A".into(),
            delivery_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            incomplete_range: (1, 2),
            holidays: BTreeSet::new(),
        });
        input.task_templates.push(TaskTemplate {
            task_num: 1,
            duration_min: 60,
            team: "M".into(),
            crew: 1,
        });
        input.task_templates.push(TaskTemplate {
            task_num: 2,
            duration_min: 120,
            team: "M".into(),
            crew: 1,
        });
        input.precedence_edges.push(RawPrecedenceEdge {
            first: 1,
            second: 2,
            relation: Relation::FinishLeqStart,
        });
        input
    }

    #[test]
    fn critical_path_remainder_sums_chain_durations() {
        let input = chain_input();
        let built = instance_builder::build(&input);
        let (graph, _) = crate::dependency_graph::DependencyGraph::build(&input, &built.instances).unwrap();
        let reverse_topo = graph.reverse_topo_order().unwrap();
        let remainder = critical_path_remainder(&graph, &built.instances, &reverse_topo);
        assert_eq!(remainder[&NodeKey::new(0, 2)], 120.0);
        assert_eq!(remainder[&NodeKey::new(0, 1)], 180.0);
    }

    #[test]
    fn non_production_kinds_use_fixed_bands() {
        let late_part = TaskInstance {
            key: NodeKey::new(0, 50),
            duration_min: 60,
            team: Some("M".into()),
            crew: 1,
            kind: TaskKind::LatePart,
            on_dock_date: None,
            primary_task_ref: None,
        };
        let input = chain_input();
        let built = instance_builder::build(&input);
        let (graph, _) = crate::dependency_graph::DependencyGraph::build(&input, &built.instances).unwrap();
        let remainder = HashMap::new();
        let now = NaiveDate::from_ymd_opt(2025, 8, 22).unwrap();
        assert_eq!(
            priority_of(late_part.key, &late_part, &input, &graph, &remainder, now),
            LATE_PART_PRIORITY
        );
    }
}
