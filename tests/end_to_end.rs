//! End-to-end scenarios E1-E6 and the quantified invariants of the
//! scheduling core, built directly against a hand-assembled `CoreInput`
//! rather than through the CSV loader: these pin down the scheduler's
//! externally observable behavior independent of ingestion.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use lineforge::metrics::{self, UNSCHEDULABLE_SENTINEL};
use lineforge::model::{
    CoreInput, LatePartConstraint, NodeKey, Product, QualityInspectionSpec, RawPrecedenceEdge,
    Relation, Shift, Team, TeamKind, TaskDetail, TaskTemplate,
};
use lineforge::optimizer::{self, JitParams, MinLatenessParams, PolicyOutcome};
use lineforge::scheduler::{CapacityOverlay, Scheduler, SchedulingInput};

fn one_shift(shift: Shift) -> BTreeSet<Shift> {
    let mut s = BTreeSet::new();
    s.insert(shift);
    s
}

fn all_shifts() -> BTreeSet<Shift> {
    let mut s = BTreeSet::new();
    s.extend(Shift::ALL);
    s
}

fn product(id: &str, delivery: NaiveDate, range: (u32, u32)) -> Product {
    Product {
        product_id: id.into(),
        delivery_date: delivery,
        incomplete_range: range,
        holidays: BTreeSet::new(),
    }
}

fn far_delivery() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
}

// E1: pure chain, one team, capacity 1.
#[test]
fn e1_pure_chain() {
    let mut core = CoreInput::default();
    core.products.push(product("P", far_delivery(), (1, 2)));
    core.task_templates.push(TaskTemplate { task_num: 1, duration_min: 60, team: "M".into(), crew: 1 });
    core.task_templates.push(TaskTemplate { task_num: 2, duration_min: 60, team: "M".into(), crew: 1 });
    core.precedence_edges.push(RawPrecedenceEdge { first: 1, second: 2, relation: Relation::FinishLeqStart });
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, one_shift(Shift::S1)));

    let (input, warnings) = SchedulingInput::build(core).unwrap();
    assert!(warnings.is_empty());
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run = Scheduler::new(&input, &overlay).run();

    let t1 = &run.assignments[&NodeKey::new(0, 1)];
    let t2 = &run.assignments[&NodeKey::new(0, 2)];
    assert_eq!(t1.start.value(), 0.0);
    assert_eq!(t1.end.value(), 60.0);
    assert_eq!(t2.start.value(), 60.0);
    assert_eq!(t2.end.value(), 120.0);
    assert_eq!(metrics::makespan_working_days(&input, &run), 1);
}

// E2: quality injection splits the chain via a companion QI node.
#[test]
fn e2_quality_injection() {
    let mut core = CoreInput::default();
    core.products.push(product("P", far_delivery(), (1, 2)));
    core.task_templates.push(TaskTemplate { task_num: 1, duration_min: 60, team: "M".into(), crew: 1 });
    core.task_templates.push(TaskTemplate { task_num: 2, duration_min: 60, team: "M".into(), crew: 1 });
    core.precedence_edges.push(RawPrecedenceEdge { first: 1, second: 2, relation: Relation::FinishLeqStart });
    core.quality_inspections.push(QualityInspectionSpec {
        primary_task_num: 1,
        qi_task_num: 10001,
        duration_min: 30,
        crew: 1,
    });
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, one_shift(Shift::S1)));
    core.quality_teams.push(Team::new("Q".into(), TeamKind::Quality, 1, one_shift(Shift::S1)));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run = Scheduler::new(&input, &overlay).run();

    let t1 = &run.assignments[&NodeKey::new(0, 1)];
    let qi = &run.assignments[&NodeKey::new(0, 10001)];
    let t2 = &run.assignments[&NodeKey::new(0, 2)];

    assert_eq!(t1.end.value(), qi.start.value(), "QI must start exactly at the primary's finish (F=S)");
    assert_eq!(qi.start.value(), 60.0);
    assert_eq!(qi.end.value(), 90.0);
    assert_eq!(t2.start.value(), 90.0);
    assert_eq!(t2.end.value(), 150.0);
    assert_eq!(qi.team, "Q");
}

// E3: capacity contention serializes two independent equal-weight tasks at
// capacity 1, and lets them overlap at capacity 2.
#[test]
fn e3_capacity_contention() {
    let build = |capacity: u32| {
        let mut core = CoreInput::default();
        core.products.push(product("P", far_delivery(), (1, 2)));
        core.task_templates.push(TaskTemplate { task_num: 1, duration_min: 120, team: "M".into(), crew: 1 });
        core.task_templates.push(TaskTemplate { task_num: 2, duration_min: 120, team: "M".into(), crew: 1 });
        core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, capacity, one_shift(Shift::S1)));
        core
    };

    let (input1, _) = SchedulingInput::build(build(1)).unwrap();
    let overlay1 = CapacityOverlay::from_teams(&input1.core.mechanic_teams, &input1.core.quality_teams);
    let run1 = Scheduler::new(&input1, &overlay1).run();
    let mut starts: Vec<f64> = run1.assignments.values().map(|a| a.start.value()).collect();
    starts.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(starts, vec![0.0, 120.0]);

    let (input2, _) = SchedulingInput::build(build(2)).unwrap();
    let overlay2 = CapacityOverlay::from_teams(&input2.core.mechanic_teams, &input2.core.quality_teams);
    let run2 = Scheduler::new(&input2, &overlay2).run();
    for a in run2.assignments.values() {
        assert_eq!(a.start.value(), 0.0);
    }
}

// E4: a late part may not start before on_dock + delta, snapped to 06:00,
// and never on a non-working day (weekend), even though the literal example
// date in the specification's prose lands on a Sunday; invariant 4 (every
// assignment falls on a working day) takes precedence, resolved in
// DESIGN.md.
#[test]
fn e4_late_part_gating() {
    let mut core = CoreInput::default();
    core.products.push(product("P", far_delivery(), (51, 51)));
    core.task_templates.push(TaskTemplate { task_num: 51, duration_min: 60, team: "M".into(), crew: 1 });
    core.late_parts.push(LatePartConstraint {
        first: 50,
        second: 51,
        on_dock: NaiveDate::from_ymd_opt(2025, 8, 23).unwrap(),
        product: None,
    });
    core.late_part_details.push(TaskDetail { task_num: 50, duration_min: 60, team: "M".into(), crew: 1 });
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, all_shifts()));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run = Scheduler::new(&input, &overlay).run();

    let late_part = &run.assignments[&NodeKey::new(0, 50)];
    let dependent = &run.assignments[&NodeKey::new(0, 51)];

    let earliest_permitted = NaiveDate::from_ymd_opt(2025, 8, 24).unwrap();
    let start_date = input.calendar.date_of(late_part.start);
    assert!(start_date >= earliest_permitted);
    use chrono::Datelike;
    assert!(!matches!(start_date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun));
    assert_eq!(late_part.end.value() - late_part.start.value(), 60.0);
    assert_eq!(dependent.start.value(), late_part.end.value());
}

// E5: the JIT optimizer finds a feasible, minimal-workforce configuration
// for two products that are each one day late at uniform capacity 1.
#[test]
fn e5_jit_optimizer_feasible_instance() {
    let mut core = CoreInput::default();
    for (id, offset) in [("A", 1i64), ("B", 1i64)] {
        core.products.push(product(id, lineforge::time::epoch().date() + chrono::Duration::days(offset), (1, 5)));
    }
    for n in 1..=5u32 {
        core.task_templates.push(TaskTemplate { task_num: n, duration_min: 60, team: "M".into(), crew: 1 });
        if n > 1 {
            core.precedence_edges.push(RawPrecedenceEdge { first: n - 1, second: n, relation: Relation::FinishLeqStart });
        }
    }
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, all_shifts()));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let params = JitParams {
        min_mechanics: 1,
        max_mechanics: 4,
        min_quality: 1,
        max_quality: 4,
        target_lateness: -1,
        tolerance: 2,
        max_iterations: 200,
    };
    let outcome = optimizer::run_jit_target(&input, params).expect("feasible JIT configuration");
    match outcome.policy {
        PolicyOutcome::JustInTime { max_deviation, .. } => assert!(max_deviation <= params.tolerance),
        _ => panic!("expected JustInTime outcome"),
    }
    for m in outcome.metrics.values() {
        assert!((m.lateness_days - params.target_lateness).abs() <= params.tolerance);
    }
}

// E6: growing the min-lateness optimizer's cap never makes the achieved
// max-lateness worse, and its Phase-2 shrink never regresses past the
// Phase-1 bound it locked in.
#[test]
fn e6_min_lateness_monotonicity() {
    let mut core = CoreInput::default();
    core.products.push(product("A", lineforge::time::epoch().date(), (1, 5)));
    for n in 1..=5u32 {
        core.task_templates.push(TaskTemplate { task_num: n, duration_min: 60, team: "M".into(), crew: 1 });
        if n > 1 {
            core.precedence_edges.push(RawPrecedenceEdge { first: n - 1, second: n, relation: Relation::FinishLeqStart });
        }
    }
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, all_shifts()));

    let (input, _) = SchedulingInput::build(core).unwrap();

    let tight = MinLatenessParams { min_mechanics: 1, max_mechanics: 2, min_quality: 1, max_quality: 1, max_iterations: 100 };
    let loose = MinLatenessParams { min_mechanics: 1, max_mechanics: 10, min_quality: 1, max_quality: 5, max_iterations: 100 };

    let tight_outcome = optimizer::run_min_lateness(&input, tight).expect("feasible under tight cap");
    let loose_outcome = optimizer::run_min_lateness(&input, loose).expect("feasible under loose cap");

    let (PolicyOutcome::MinLateness { achieved_max_lateness: tight_lateness, .. },
         PolicyOutcome::MinLateness { achieved_max_lateness: loose_lateness, .. }) =
        (tight_outcome.policy, loose_outcome.policy)
    else {
        panic!("expected MinLateness outcomes");
    };
    assert!(loose_lateness <= tight_lateness, "a wider cap must never yield a worse max-lateness");
}

// Invariant 6: the priority list is sorted ascending by (start, slack) and
// carries a 1-based rank matching its position.
#[test]
fn priority_list_is_ordered_with_matching_rank() {
    let mut core = CoreInput::default();
    core.products.push(product("P", far_delivery(), (1, 3)));
    for n in 1..=3u32 {
        core.task_templates.push(TaskTemplate { task_num: n, duration_min: 30, team: "M".into(), crew: 1 });
    }
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 3, one_shift(Shift::S1)));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run = Scheduler::new(&input, &overlay).run();
    let boundary = lineforge::boundary::Boundary::from_input(&input.core);
    let list = metrics::priority_list(&input, &run, &input.graph, &input.instances, &boundary, &input.clock);

    assert_eq!(list.len(), 3);
    for (i, entry) in list.iter().enumerate() {
        assert_eq!(entry.priority_rank, i + 1);
    }
    for pair in list.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.start < b.start || (a.start == b.start && a.slack_hours <= b.slack_hours),
            "priority list must be sorted ascending by (start, slack_hours)"
        );
    }
}

// Invariant 8: running the scheduler twice on identical inputs yields
// byte-identical start/end assignments (determinism).
#[test]
fn scheduling_is_deterministic_across_runs() {
    let mut core = CoreInput::default();
    core.products.push(product("A", far_delivery(), (1, 4)));
    for n in 1..=4u32 {
        core.task_templates.push(TaskTemplate { task_num: n, duration_min: 45, team: "M".into(), crew: 1 });
    }
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 2, one_shift(Shift::S1)));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run_a = Scheduler::new(&input, &overlay).run();
    let run_b = Scheduler::new(&input, &overlay).run();

    assert_eq!(run_a.assignments.len(), run_b.assignments.len());
    for (key, a) in &run_a.assignments {
        let b = &run_b.assignments[key];
        assert_eq!(a.start.value(), b.start.value());
        assert_eq!(a.end.value(), b.end.value());
        assert_eq!(a.team, b.team);
    }
}

// Invariant 9: reducing a team's capacity by one and rescheduling never
// decreases any product's lateness.
#[test]
fn capacity_reduction_never_improves_lateness() {
    let mut core = CoreInput::default();
    core.products.push(product("A", far_delivery(), (1, 6)));
    for n in 1..=6u32 {
        core.task_templates.push(TaskTemplate { task_num: n, duration_min: 60, team: "M".into(), crew: 1 });
    }
    core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 3, all_shifts()));

    let (input, _) = SchedulingInput::build(core).unwrap();
    let wide = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run_wide = Scheduler::new(&input, &wide).run();
    let metrics_wide = metrics::lateness_metrics(&input, &run_wide);

    let mut narrow = wide.clone();
    *narrow.mechanic.get_mut("M").unwrap() -= 1;
    let run_narrow = Scheduler::new(&input, &narrow).run();
    let metrics_narrow = metrics::lateness_metrics(&input, &run_narrow);

    assert!(metrics_narrow["A"].lateness_days >= metrics_wide["A"].lateness_days);
}

// Boundary behavior 11: a QI needing 2 crew that already saturates its
// quality team's capacity cannot share any minute with another task on that
// team; raising capacity by one frees enough headroom for a 1-crew task to
// run alongside it.
#[test]
fn qi_crew_respects_quality_team_capacity() {
    let build = |qi_capacity: u32| {
        let mut core = CoreInput::default();
        core.products.push(product("P", far_delivery(), (1, 2)));
        core.task_templates.push(TaskTemplate { task_num: 1, duration_min: 30, team: "M".into(), crew: 1 });
        core.task_templates.push(TaskTemplate { task_num: 2, duration_min: 30, team: "M".into(), crew: 1 });
        core.quality_inspections.push(QualityInspectionSpec { primary_task_num: 1, qi_task_num: 10001, duration_min: 30, crew: 2 });
        core.quality_inspections.push(QualityInspectionSpec { primary_task_num: 2, qi_task_num: 10002, duration_min: 30, crew: 1 });
        core.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 2, one_shift(Shift::S1)));
        core.quality_teams.push(Team::new("Q".into(), TeamKind::Quality, qi_capacity, one_shift(Shift::S1)));
        core
    };

    // Capacity exactly matches the larger QI's crew: it fills the team, so
    // the 1-crew QI must be pushed to a disjoint window.
    let (input1, _) = SchedulingInput::build(build(2)).unwrap();
    let overlay1 = CapacityOverlay::from_teams(&input1.core.mechanic_teams, &input1.core.quality_teams);
    let run1 = Scheduler::new(&input1, &overlay1).run();
    let qi_a = &run1.assignments[&NodeKey::new(0, 10001)];
    let qi_b = &run1.assignments[&NodeKey::new(0, 10002)];
    let overlap = qi_a.start.value() < qi_b.end.value() && qi_b.start.value() < qi_a.end.value();
    assert!(!overlap, "a 2-crew QI that saturates capacity must not share any minute with another task");

    // One more seat of headroom lets the 1-crew QI run concurrently.
    let (input2, _) = SchedulingInput::build(build(3)).unwrap();
    let overlay2 = CapacityOverlay::from_teams(&input2.core.mechanic_teams, &input2.core.quality_teams);
    let run2 = Scheduler::new(&input2, &overlay2).run();
    let qi_a2 = &run2.assignments[&NodeKey::new(0, 10001)];
    let qi_b2 = &run2.assignments[&NodeKey::new(0, 10002)];
    let overlaps_now = qi_a2.start.value() < qi_b2.end.value() && qi_b2.start.value() < qi_a2.end.value();
    assert!(overlaps_now, "with headroom, the 1-crew QI should be free to share minutes with the 2-crew QI");
}
