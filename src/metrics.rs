//! Makespan and per-product lateness, plus the boundary `priority_list`
//! output.
//!
//! Both walk the finished schedule rather than anything kept live during
//! scheduling, so they are plain functions over a [`ScheduleRun`] rather
//! than methods that mutate scheduler state.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::boundary::Boundary;
use crate::dependency_graph::DependencyGraph;
use crate::model::{CoreInput, NodeKey, TaskInstance, TaskKind};
use crate::priority;
use crate::scheduler::{ScheduleRun, SchedulingInput};
use crate::time::Clock;

/// Sentinel used at the external boundary for an unschedulable product's
/// lateness and for the crate-wide makespan when any live instance failed.
pub const UNSCHEDULABLE_SENTINEL: i64 = 999_999;

/// Per-product metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMetrics {
    pub product_id: String,
    pub delivery_date: NaiveDate,
    pub projected_completion: Option<NaiveDate>,
    pub lateness_days: i64,
    pub on_time: bool,
    pub total_tasks: usize,
    pub unique_tasks: usize,
    pub breakdown: HashMap<&'static str, usize>,
}

fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Production => "Production",
        TaskKind::LatePart => "Late Part",
        TaskKind::Rework => "Rework",
        TaskKind::QualityInspection => "Quality Inspection",
    }
}

/// Computes lateness metrics for every product. A product with no scheduled
/// task instances (every one of its instances failed, or it has none) gets
/// [`UNSCHEDULABLE_SENTINEL`].
pub fn lateness_metrics(
    input: &SchedulingInput,
    run: &ScheduleRun,
) -> HashMap<String, ProductMetrics> {
    let mut by_product: HashMap<u32, Vec<NodeKey>> = HashMap::new();
    for &key in run.assignments.keys() {
        by_product.entry(key.product).or_default().push(key);
    }

    let mut out = HashMap::new();
    for (index, product) in input.core.products.iter().enumerate() {
        let index = index as u32;
        let keys = by_product.get(&index);

        let metrics = match keys {
            Some(keys) if !keys.is_empty() => {
                let last_end = keys
                    .iter()
                    .map(|k| input.clock.from_axis(run.assignments[k].end).date())
                    .max()
                    .expect("non-empty keys");
                let lateness_days = (last_end - product.delivery_date).num_days();

                let mut breakdown: HashMap<&'static str, usize> = HashMap::new();
                let mut unique_tasks = std::collections::HashSet::new();
                for &k in keys {
                    let kind = input.instances[&k].kind;
                    *breakdown.entry(kind_label(kind)).or_insert(0) += 1;
                    unique_tasks.insert(k.task_num);
                }

                ProductMetrics {
                    product_id: product.product_id.clone(),
                    delivery_date: product.delivery_date,
                    projected_completion: Some(last_end),
                    lateness_days,
                    on_time: lateness_days <= 0,
                    total_tasks: keys.len(),
                    unique_tasks: unique_tasks.len(),
                    breakdown,
                }
            }
            _ => ProductMetrics {
                product_id: product.product_id.clone(),
                delivery_date: product.delivery_date,
                projected_completion: None,
                lateness_days: UNSCHEDULABLE_SENTINEL,
                on_time: false,
                total_tasks: 0,
                unique_tasks: 0,
                breakdown: HashMap::new(),
            },
        };
        out.insert(product.product_id.clone(), metrics);
    }
    out
}

/// Makespan as a count of working days. Returns [`UNSCHEDULABLE_SENTINEL`]
/// if any live instance failed to schedule, or `0` if nothing was scheduled
/// at all.
pub fn makespan_working_days(input: &SchedulingInput, run: &ScheduleRun) -> i64 {
    if run.assignments.is_empty() {
        return 0;
    }
    if !run.failed.is_empty() {
        return UNSCHEDULABLE_SENTINEL;
    }

    let start = run
        .assignments
        .values()
        .map(|a| a.start.value())
        .fold(f64::INFINITY, f64::min);
    let end = run
        .assignments
        .values()
        .map(|a| a.end.value())
        .fold(f64::NEG_INFINITY, f64::max);

    let start_date = input.clock.from_axis(qtty::Quantity::new(start)).date();
    let end_date = input.clock.from_axis(qtty::Quantity::new(end)).date();

    let mut working_days = 0i64;
    let mut current = start_date;
    while current <= end_date {
        if input
            .core
            .products
            .iter()
            .any(|p| p.is_working_day(current))
        {
            working_days += 1;
        }
        current += chrono::Duration::days(1);
    }
    working_days
}

/// One row of the boundary `priority_list` output.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityListEntry {
    pub display_name: String,
    pub kind: TaskKind,
    pub start: NaiveDateTime,
    pub slack_hours: f64,
    /// 1-based rank in the (start, slack) ordering.
    pub priority_rank: usize,
}

/// Builds the sorted priority list: ascending by `(start, slack_hours)`,
/// `priority_rank` set to the 1-based position. Sorts on the full scheduled
/// instant, not just its calendar date, so same-day tasks at different
/// start times still order correctly.
pub fn priority_list(
    input: &SchedulingInput,
    run: &ScheduleRun,
    graph: &DependencyGraph,
    instances: &HashMap<NodeKey, TaskInstance>,
    boundary: &Boundary,
    clock: &Clock,
) -> Vec<PriorityListEntry> {
    let mut rows: Vec<(NodeKey, NaiveDateTime, f64)> = run
        .assignments
        .iter()
        .map(|(&key, assignment)| {
            let start = clock.from_axis(assignment.start);
            let slack = priority::slack_hours(
                key,
                Some(assignment.start),
                &input.core,
                graph,
                instances,
                clock,
            );
            (key, start, slack)
        })
        .collect();

    rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2.total_cmp(&b.2)));

    rows.into_iter()
        .enumerate()
        .map(|(i, (key, start, slack))| PriorityListEntry {
            display_name: boundary.format(key),
            kind: instances[&key].kind,
            start,
            slack_hours: slack,
            priority_rank: i + 1,
        })
        .collect()
}

/// True if `product` has at least one failed (unschedulable) live instance.
pub fn product_has_failure(run: &ScheduleRun, core: &CoreInput, product_index: u32) -> bool {
    let _ = core;
    run.failed.iter().any(|k| k.product == product_index)
}
