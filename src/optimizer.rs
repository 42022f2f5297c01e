//! The three scheduling policies that drive the scheduler: CSV-fixed,
//! just-in-time target, and minimum-lateness-then-workforce.
//!
//! Each trial builds its own [`CapacityOverlay`] and calls [`Scheduler::run`]
//! fresh rather than mutating a single shared capacity map in place. All
//! three restore nothing on the caller's behalf because they never touch
//! the original capacities in [`crate::model::Team`] to begin with.

use std::collections::HashMap;

use crate::metrics::{self, ProductMetrics};
use crate::scheduler::{CapacityOverlay, ScheduleRun, Scheduler, SchedulingInput};

const MINUTES_PER_SHIFT: f64 = 8.5 * 60.0;

/// Outcome of one optimizer run: the final capacity map, per-product
/// metrics, makespan, and a policy-specific summary.
#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    pub mechanic: HashMap<String, u32>,
    pub quality: HashMap<String, u32>,
    pub metrics: HashMap<String, ProductMetrics>,
    pub makespan_working_days: i64,
    pub policy: PolicyOutcome,
}

#[derive(Debug, Clone)]
pub enum PolicyOutcome {
    CsvFixed,
    JustInTime {
        target_lateness: i64,
        max_deviation: i64,
        total_workforce: u32,
    },
    MinLateness {
        achieved_max_lateness: i64,
        total_workforce: u32,
    },
}

fn run_trial(input: &SchedulingInput, overlay: &CapacityOverlay) -> ScheduleRun {
    Scheduler::new(input, overlay).run()
}

/// Runs one uniform-capacity trial per `level` concurrently and reports
/// which ones meet `target`/`tolerance`. A building block for a
/// feasibility search over a whole band of levels at once; not used by
/// [`run_jit_target`]'s default Phase 1, which stops at the first feasible
/// level and so has nothing to gain from probing the rest in parallel.
pub fn probe_levels_parallel(
    input: &SchedulingInput,
    mechanic_names: &[String],
    quality_names: &[String],
    levels: &[u32],
    quality_level_for: impl Fn(u32) -> u32 + Sync,
    target: i64,
    tolerance: i64,
) -> Vec<(u32, bool)> {
    use rayon::prelude::*;

    levels
        .par_iter()
        .map(|&level| {
            let overlay = CapacityOverlay {
                mechanic: mechanic_names.iter().map(|n| (n.clone(), level)).collect(),
                quality: quality_names
                    .iter()
                    .map(|n| (n.clone(), quality_level_for(level)))
                    .collect(),
            };
            let run = run_trial(input, &overlay);
            let run_metrics = metrics::lateness_metrics(input, &run);
            (level, meets_tolerance(&run, &run_metrics, target, tolerance))
        })
        .collect()
}

fn total_workforce(overlay: &CapacityOverlay) -> u32 {
    overlay.mechanic.values().sum::<u32>() + overlay.quality.values().sum::<u32>()
}

fn team_names(input: &SchedulingInput) -> (Vec<String>, Vec<String>) {
    (
        input.core.mechanic_teams.iter().map(|t| t.name.clone()).collect(),
        input.core.quality_teams.iter().map(|t| t.name.clone()).collect(),
    )
}

/// `(total scheduled minute*crew, peak concurrent headcount)` per team,
/// recomputed from the finished assignment map.
fn team_loads(run: &ScheduleRun) -> HashMap<String, (f64, f64)> {
    let mut by_team: HashMap<String, Vec<(f64, f64, f64)>> = HashMap::new();
    for a in run.assignments.values() {
        by_team
            .entry(a.team.clone())
            .or_default()
            .push((a.start.value(), a.end.value(), a.crew as f64));
    }
    by_team
        .into_iter()
        .map(|(team, intervals)| {
            let total_minutes: f64 = intervals.iter().map(|(s, e, c)| (e - s) * c).sum();
            let peak = intervals
                .iter()
                .map(|&(s0, _, _)| {
                    intervals
                        .iter()
                        .filter(|&&(s, e, _)| s <= s0 && s0 < e)
                        .map(|&(_, _, c)| c)
                        .sum::<f64>()
                })
                .fold(0.0_f64, f64::max);
            (team, (total_minutes, peak))
        })
        .collect()
}

/// Utilization fraction per team: scheduled minute*crew over available
/// minute*crew across the makespan.
fn team_utilization(
    input: &SchedulingInput,
    run: &ScheduleRun,
    overlay: &CapacityOverlay,
) -> HashMap<String, f64> {
    let total_days = metrics::makespan_working_days(input, run).max(1) as f64;
    let loads = team_loads(run);
    input
        .core
        .mechanic_teams
        .iter()
        .chain(input.core.quality_teams.iter())
        .map(|team| {
            let capacity = overlay.capacity_of(&team.name).unwrap_or(0) as f64;
            let shifts_per_day = team.shifts.len() as f64;
            let available = capacity * shifts_per_day * MINUTES_PER_SHIFT * total_days;
            let scheduled = loads.get(&team.name).map(|&(m, _)| m).unwrap_or(0.0);
            let util = if available > 0.0 { scheduled / available } else { 0.0 };
            (team.name.clone(), util)
        })
        .collect()
}

fn is_mechanic(overlay: &CapacityOverlay, team: &str) -> bool {
    overlay.mechanic.contains_key(team)
}

/// Grows or shrinks `team`'s capacity by `delta`, clamped to `[floor, cap]`.
/// Returns whether the value actually changed.
fn adjust_capacity(overlay: &mut CapacityOverlay, team: &str, delta: i32, floor: u32, cap: u32) -> bool {
    let map = if is_mechanic(overlay, team) {
        &mut overlay.mechanic
    } else {
        &mut overlay.quality
    };
    let Some(c) = map.get_mut(team) else { return false };
    let new = if delta >= 0 {
        c.saturating_add(delta as u32).min(cap)
    } else {
        c.saturating_sub((-delta) as u32).max(floor)
    };
    if new == *c {
        return false;
    }
    *c = new;
    true
}

/// Uniform dispatch surface over the three policies, implemented as a
/// shared trait object so the CLI can select a policy by name without
/// matching on an enum itself.
pub trait Optimizer {
    fn run(&self, input: &SchedulingInput) -> Option<OptimizerOutcome>;
}

pub struct CsvFixed;

impl Optimizer for CsvFixed {
    fn run(&self, input: &SchedulingInput) -> Option<OptimizerOutcome> {
        Some(run_csv_fixed(input))
    }
}

pub struct JustInTime(pub JitParams);

impl Optimizer for JustInTime {
    fn run(&self, input: &SchedulingInput) -> Option<OptimizerOutcome> {
        run_jit_target(input, self.0)
    }
}

pub struct MinLateness(pub MinLatenessParams);

impl Optimizer for MinLateness {
    fn run(&self, input: &SchedulingInput) -> Option<OptimizerOutcome> {
        run_min_lateness(input, self.0)
    }
}

/// CSV-fixed: run once at the input-loaded capacities. The scheduler itself
/// never refuses a late delivery; it's purely up to the caller to treat
/// lateness as fatal, which this core does not do at all.
pub fn run_csv_fixed(input: &SchedulingInput) -> OptimizerOutcome {
    let overlay = CapacityOverlay::from_teams(&input.core.mechanic_teams, &input.core.quality_teams);
    let run = run_trial(input, &overlay);
    let run_metrics = metrics::lateness_metrics(input, &run);
    let makespan = metrics::makespan_working_days(input, &run);
    OptimizerOutcome {
        mechanic: overlay.mechanic,
        quality: overlay.quality,
        metrics: run_metrics,
        makespan_working_days: makespan,
        policy: PolicyOutcome::CsvFixed,
    }
}

/// Parameters for the just-in-time target policy.
#[derive(Debug, Clone, Copy)]
pub struct JitParams {
    pub min_mechanics: u32,
    pub max_mechanics: u32,
    pub min_quality: u32,
    pub max_quality: u32,
    pub target_lateness: i64,
    pub tolerance: i64,
    pub max_iterations: u32,
}

impl Default for JitParams {
    fn default() -> Self {
        Self {
            min_mechanics: 1,
            max_mechanics: 30,
            min_quality: 1,
            max_quality: 15,
            target_lateness: -1,
            tolerance: 2,
            max_iterations: 300,
        }
    }
}

fn meets_tolerance(run: &ScheduleRun, metrics: &HashMap<String, ProductMetrics>, target: i64, tolerance: i64) -> bool {
    run.failed.is_empty() && metrics.values().all(|m| (m.lateness_days - target).abs() <= tolerance)
}

fn max_deviation(metrics: &HashMap<String, ProductMetrics>, target: i64) -> i64 {
    metrics.values().map(|m| (m.lateness_days - target).abs()).max().unwrap_or(0)
}

fn worst_product(metrics: &HashMap<String, ProductMetrics>, target: i64) -> Option<(String, i64)> {
    metrics
        .values()
        .max_by_key(|m| (m.lateness_days - target).abs())
        .map(|m| (m.product_id.clone(), m.lateness_days))
}

/// Team consuming the most scheduled minute*crew for one product, used to
/// pick which team to grow next when shrinking under tolerance.
fn team_consuming_most_minutes(input: &SchedulingInput, run: &ScheduleRun, product_id: &str) -> Option<String> {
    let product_index = input.core.product_index(product_id)?;
    let mut by_team: HashMap<String, f64> = HashMap::new();
    for (key, assignment) in &run.assignments {
        if key.product != product_index {
            continue;
        }
        *by_team.entry(assignment.team.clone()).or_insert(0.0) += assignment.duration().value() * assignment.crew as f64;
    }
    by_team
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(team, _)| team)
}

fn globally_least_utilized(util: &HashMap<String, f64>) -> Option<String> {
    util.iter().min_by(|a, b| a.1.total_cmp(b.1)).map(|(team, _)| team.clone())
}

fn least_utilized_above_floor(
    util: &HashMap<String, f64>,
    overlay: &CapacityOverlay,
    min_mechanics: u32,
    min_quality: u32,
) -> Option<String> {
    util.iter()
        .filter(|(team, _)| {
            let floor = if is_mechanic(overlay, team) { min_mechanics } else { min_quality };
            overlay.capacity_of(team).unwrap_or(0) > floor
        })
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(team, _)| team.clone())
}

/// Just-in-time target: grow every team uniformly until a feasible (all
/// scheduled, within-tolerance) configuration is found, then shrink/shift
/// workforce while staying within tolerance.
pub fn run_jit_target(input: &SchedulingInput, params: JitParams) -> Option<OptimizerOutcome> {
    let (mechanic_names, quality_names) = team_names(input);

    let mut overlay = CapacityOverlay {
        mechanic: mechanic_names.iter().map(|n| (n.clone(), params.min_mechanics)).collect(),
        quality: quality_names.iter().map(|n| (n.clone(), params.min_quality)).collect(),
    };

    // Phase 1: feasibility via uniform capacity increase.
    let mut level = params.min_mechanics;
    let mut feasible = false;
    while level <= params.max_mechanics {
        for n in &mechanic_names {
            overlay.mechanic.insert(n.clone(), level);
        }
        let qlevel = (level / 5 + 1).min(params.max_quality);
        for n in &quality_names {
            overlay.quality.insert(n.clone(), qlevel);
        }
        let run = run_trial(input, &overlay);
        let run_metrics = metrics::lateness_metrics(input, &run);
        if meets_tolerance(&run, &run_metrics, params.target_lateness, params.tolerance) {
            feasible = true;
            break;
        }
        level += 1;
    }
    if !feasible {
        tracing::warn!("JIT optimizer found no feasible uniform level within bounds");
        return None;
    }

    // Phase 2: shrink/shift while holding tolerance.
    let mut best_overlay = overlay.clone();
    let initial_run = run_trial(input, &overlay);
    let mut best_metrics = metrics::lateness_metrics(input, &initial_run);
    let mut best_workforce = total_workforce(&best_overlay);
    let mut best_max_deviation = max_deviation(&best_metrics, params.target_lateness);

    let mut no_improvement = 0u32;
    let mut iteration = 0u32;

    while iteration < params.max_iterations && no_improvement < 30 {
        iteration += 1;
        let run = run_trial(input, &overlay);
        let run_metrics = metrics::lateness_metrics(input, &run);
        let within_tolerance = meets_tolerance(&run, &run_metrics, params.target_lateness, params.tolerance);
        let mut improved = false;

        if within_tolerance {
            let workforce = total_workforce(&overlay);
            let deviation = max_deviation(&run_metrics, params.target_lateness);
            if workforce < best_workforce || deviation < best_max_deviation {
                best_overlay = overlay.clone();
                best_metrics = run_metrics.clone();
                best_workforce = workforce;
                best_max_deviation = deviation;
                improved = true;
            }

            let util = team_utilization(input, &run, &overlay);
            if let Some(team) = least_utilized_above_floor(&util, &overlay, params.min_mechanics, params.min_quality) {
                let floor = if is_mechanic(&overlay, &team) { params.min_mechanics } else { params.min_quality };
                let cap = if is_mechanic(&overlay, &team) { params.max_mechanics } else { params.max_quality };
                let mut trial = overlay.clone();
                if adjust_capacity(&mut trial, &team, -1, floor, cap) {
                    let trial_run = run_trial(input, &trial);
                    let trial_metrics = metrics::lateness_metrics(input, &trial_run);
                    if meets_tolerance(&trial_run, &trial_metrics, params.target_lateness, params.tolerance) {
                        overlay = trial;
                        improved = true;
                    }
                }
            }
        } else if let Some((product_id, lateness)) = worst_product(&run_metrics, params.target_lateness) {
            if lateness > params.target_lateness + params.tolerance {
                if let Some(team) = team_consuming_most_minutes(input, &run, &product_id) {
                    let cap = if is_mechanic(&overlay, &team) { params.max_mechanics } else { params.max_quality };
                    if adjust_capacity(&mut overlay, &team, 1, 0, cap) {
                        improved = true;
                    }
                }
            } else if lateness < params.target_lateness - 2 * params.tolerance {
                let util = team_utilization(input, &run, &overlay);
                if let Some(team) = globally_least_utilized(&util) {
                    let floor = if is_mechanic(&overlay, &team) { params.min_mechanics } else { params.min_quality };
                    if adjust_capacity(&mut overlay, &team, -1, floor, u32::MAX) {
                        improved = true;
                    }
                }
            }
        }

        if improved {
            no_improvement = 0;
        } else {
            no_improvement += 1;
        }
    }

    let best_run = run_trial(input, &best_overlay);
    Some(OptimizerOutcome {
        mechanic: best_overlay.mechanic.clone(),
        quality: best_overlay.quality.clone(),
        metrics: best_metrics,
        makespan_working_days: metrics::makespan_working_days(input, &best_run),
        policy: PolicyOutcome::JustInTime {
            target_lateness: params.target_lateness,
            max_deviation: best_max_deviation,
            total_workforce: best_workforce,
        },
    })
}

/// Parameters for the minimum-lateness multidimensional policy.
#[derive(Debug, Clone, Copy)]
pub struct MinLatenessParams {
    pub min_mechanics: u32,
    pub max_mechanics: u32,
    pub min_quality: u32,
    pub max_quality: u32,
    pub max_iterations: u32,
}

impl Default for MinLatenessParams {
    fn default() -> Self {
        Self {
            min_mechanics: 1,
            max_mechanics: 20,
            min_quality: 1,
            max_quality: 10,
            max_iterations: 300,
        }
    }
}

/// Mechanic/quality teams owning a currently-failed instance.
fn blocking_teams(input: &SchedulingInput, run: &ScheduleRun) -> (Vec<String>, Vec<String>) {
    let mut mech = std::collections::HashSet::new();
    let mut qual = std::collections::HashSet::new();
    for &key in &run.failed {
        let instance = &input.instances[&key];
        if instance.kind == crate::model::TaskKind::QualityInspection {
            qual.extend(input.core.quality_teams.iter().map(|t| t.name.clone()));
        } else if let Some(team) = &instance.team {
            mech.insert(team.clone());
        }
    }
    (mech.into_iter().collect(), qual.into_iter().collect())
}

fn grow_smallest(overlay: &mut CapacityOverlay, max_mechanics: u32, max_quality: u32) -> bool {
    let smallest_mech = overlay.mechanic.iter().filter(|(_, &c)| c < max_mechanics).min_by_key(|(_, &c)| c).map(|(n, _)| n.clone());
    let smallest_qual = overlay.quality.iter().filter(|(_, &c)| c < max_quality).min_by_key(|(_, &c)| c).map(|(n, _)| n.clone());
    match (smallest_mech, smallest_qual) {
        (Some(m), Some(q)) => {
            let mc = overlay.mechanic[&m];
            let qc = overlay.quality[&q];
            if mc <= qc {
                *overlay.mechanic.get_mut(&m).unwrap() += 1;
            } else {
                *overlay.quality.get_mut(&q).unwrap() += 1;
            }
            true
        }
        (Some(m), None) => {
            *overlay.mechanic.get_mut(&m).unwrap() += 1;
            true
        }
        (None, Some(q)) => {
            *overlay.quality.get_mut(&q).unwrap() += 1;
            true
        }
        (None, None) => false,
    }
}

/// Minimum-lateness multidimensional: Phase 1 finds the minimum achievable
/// max-lateness by growing blocking/bottleneck teams; Phase 2 shrinks
/// underutilized teams while holding that lateness.
pub fn run_min_lateness(input: &SchedulingInput, params: MinLatenessParams) -> Option<OptimizerOutcome> {
    let (mechanic_names, quality_names) = team_names(input);
    let mut overlay = CapacityOverlay {
        mechanic: mechanic_names.iter().map(|n| (n.clone(), params.min_mechanics)).collect(),
        quality: quality_names.iter().map(|n| (n.clone(), params.min_quality)).collect(),
    };

    let mut best_max_lateness = i64::MAX;
    let mut iterations_without_improvement = 0u32;
    let mut iteration = 0u32;

    loop {
        if iteration >= params.max_iterations {
            break;
        }
        iteration += 1;

        let run = run_trial(input, &overlay);

        if !run.failed.is_empty() {
            let (blocking_mech, blocking_qual) = blocking_teams(input, &run);
            let mut grew = false;
            for team in &blocking_mech {
                if adjust_capacity(&mut overlay, team, 1, 0, params.max_mechanics) {
                    grew = true;
                    break;
                }
            }
            if !grew {
                for team in &blocking_qual {
                    if adjust_capacity(&mut overlay, team, 1, 0, params.max_quality) {
                        grew = true;
                        break;
                    }
                }
            }
            if !grew {
                break;
            }
            continue;
        }

        let run_metrics = metrics::lateness_metrics(input, &run);
        let max_lateness = run_metrics.values().map(|m| m.lateness_days).max().unwrap_or(0);

        if max_lateness < best_max_lateness {
            best_max_lateness = max_lateness;
            iterations_without_improvement = 0;
            continue;
        }
        iterations_without_improvement += 1;

        if iterations_without_improvement >= 20 {
            let loads = team_loads(&run);
            let bottleneck = loads
                .iter()
                .find(|(team, &(_, peak))| {
                    let cap = overlay.capacity_of(team).unwrap_or(0) as f64;
                    cap > 0.0 && peak >= 0.9 * cap
                })
                .map(|(team, _)| team.clone());

            let grown = match bottleneck {
                Some(team) if is_mechanic(&overlay, &team) => adjust_capacity(&mut overlay, &team, 2, 0, params.max_mechanics),
                Some(team) => adjust_capacity(&mut overlay, &team, 1, 0, params.max_quality),
                None => grow_smallest(&mut overlay, params.max_mechanics, params.max_quality),
            };
            if !grown {
                break;
            }
            iterations_without_improvement = 0;
        }
    }

    let phase1_run = run_trial(input, &overlay);
    if !phase1_run.failed.is_empty() {
        tracing::warn!("min-lateness optimizer could not schedule all instances within caps");
        return None;
    }
    let phase1_metrics = metrics::lateness_metrics(input, &phase1_run);
    let target_max_lateness = phase1_metrics.values().map(|m| m.lateness_days).max().unwrap_or(0);
    let target_total_lateness = (phase1_metrics
        .values()
        .map(|m| m.lateness_days.max(0))
        .sum::<i64>() as f64
        * 1.1)
        .round() as i64;

    // Phase 2: shrink underutilized teams while holding both targets.
    for _round in 0..50 {
        let run = run_trial(input, &overlay);
        let util = team_utilization(input, &run, &overlay);
        let candidate = util
            .iter()
            .filter(|(team, &u)| {
                u < 0.7
                    && overlay.capacity_of(team).unwrap_or(0)
                        > if is_mechanic(&overlay, team) { params.min_mechanics } else { params.min_quality }
            })
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(team, _)| team.clone());

        let Some(team) = candidate else { break };
        let mut trial = overlay.clone();
        let floor = if is_mechanic(&trial, &team) { params.min_mechanics } else { params.min_quality };
        if !adjust_capacity(&mut trial, &team, -1, floor, u32::MAX) {
            break;
        }

        let trial_run = run_trial(input, &trial);
        if !trial_run.failed.is_empty() {
            continue;
        }
        let trial_metrics = metrics::lateness_metrics(input, &trial_run);
        let trial_max = trial_metrics.values().map(|m| m.lateness_days).max().unwrap_or(0);
        let trial_total: i64 = trial_metrics.values().map(|m| m.lateness_days.max(0)).sum();
        if trial_max <= target_max_lateness && trial_total <= target_total_lateness {
            overlay = trial;
        }
    }

    let final_run = run_trial(input, &overlay);
    let final_metrics = metrics::lateness_metrics(input, &final_run);
    let achieved_max_lateness = final_metrics.values().map(|m| m.lateness_days).max().unwrap_or(0);
    Some(OptimizerOutcome {
        mechanic: overlay.mechanic.clone(),
        quality: overlay.quality.clone(),
        makespan_working_days: metrics::makespan_working_days(input, &final_run),
        metrics: final_metrics,
        policy: PolicyOutcome::MinLateness {
            achieved_max_lateness,
            total_workforce: total_workforce(&overlay),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn serial_chain_input(len: u32, delivery_offset_days: i64) -> CoreInput {
        let mut input = CoreInput::default();
        input.products.push(Product {
            product_id: "A".into(),
            delivery_date: crate::time::epoch().date() + chrono::Duration::days(delivery_offset_days),
            incomplete_range: (1, len),
            holidays: BTreeSet::new(),
        });
        for n in 1..=len {
            input.task_templates.push(TaskTemplate {
                task_num: n,
                duration_min: 60,
                team: "M".into(),
                crew: 1,
            });
            if n > 1 {
                input.precedence_edges.push(RawPrecedenceEdge {
                    first: n - 1,
                    second: n,
                    relation: Relation::FinishLeqStart,
                });
            }
        }
        let mut shifts = BTreeSet::new();
        shifts.insert(Shift::S1);
        shifts.insert(Shift::S2);
        shifts.insert(Shift::S3);
        input.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, shifts));
        input
    }

    #[test]
    fn csv_fixed_runs_once_at_loaded_capacities() {
        let core = serial_chain_input(3, 5);
        let (scheduling_input, _) = SchedulingInput::build(core).unwrap();
        let outcome = run_csv_fixed(&scheduling_input);
        assert_eq!(outcome.mechanic["M"], 1);
        assert!(matches!(outcome.policy, PolicyOutcome::CsvFixed));
    }

    #[test]
    fn jit_optimizer_finds_tolerance_respecting_config() {
        let core = serial_chain_input(5, 1);
        let (scheduling_input, _) = SchedulingInput::build(core).unwrap();
        let params = JitParams {
            min_mechanics: 1,
            max_mechanics: 10,
            min_quality: 1,
            max_quality: 4,
            target_lateness: -1,
            tolerance: 2,
            max_iterations: 50,
        };
        let outcome = run_jit_target(&scheduling_input, params).expect("feasible config");
        if let PolicyOutcome::JustInTime { max_deviation, .. } = outcome.policy {
            assert!(max_deviation <= params.tolerance);
        } else {
            panic!("expected JustInTime outcome");
        }
    }

    #[test]
    fn min_lateness_optimizer_does_not_exceed_phase1_bound() {
        let core = serial_chain_input(5, 0);
        let (scheduling_input, _) = SchedulingInput::build(core).unwrap();
        let params = MinLatenessParams {
            min_mechanics: 1,
            max_mechanics: 5,
            min_quality: 1,
            max_quality: 3,
            max_iterations: 50,
        };
        let outcome = run_min_lateness(&scheduling_input, params).expect("feasible config");
        if let PolicyOutcome::MinLateness { achieved_max_lateness, .. } = outcome.policy {
            assert!(achieved_max_lateness < i64::MAX);
        } else {
            panic!("expected MinLateness outcome");
        }
    }
}
