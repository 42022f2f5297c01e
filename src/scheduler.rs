//! Capacity-aware forward scheduler.
//!
//! An immutable [`SchedulingInput`] (instances, dependency graph, teams) is
//! built once; each call to [`Scheduler::run`] takes a capacity overlay and
//! produces a fresh [`ScheduleRun`] that owns its own assignment map, heap
//! and caches, so optimizer trials never share mutable state with each
//! other.

use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::NaiveDate;
use qtty::{Minute, Quantity};

use crate::calendar::Calendar;
use crate::capacity::TeamTimeline;
use crate::dependency_graph::DependencyGraph;
use crate::error::CoreError;
use crate::instance_builder;
use crate::model::{CoreInput, NodeKey, Relation, ScheduledAssignment, Shift, TaskInstance, TaskKind, Team};
use crate::priority;
use crate::time::Clock;

/// Bounded search caps for feasible-start scanning and scheduling retries.
pub const MAX_MINUTE_STEPS: i64 = 5_000;
pub const MAX_RETRIES: u32 = 3;
const ITERATION_FACTOR: usize = 10;

/// Late-part delay Δ, default one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatePartDelay(pub i64);

impl Default for LatePartDelay {
    fn default() -> Self {
        Self(1)
    }
}

/// Everything the scheduler needs that does not change between runs.
pub struct SchedulingInput {
    pub core: CoreInput,
    pub instances: HashMap<NodeKey, TaskInstance>,
    pub graph: DependencyGraph,
    pub clock: Clock,
    pub calendar: Calendar,
    pub late_part_delay: LatePartDelay,
    critical_path: HashMap<NodeKey, f64>,
}

impl SchedulingInput {
    pub fn build(core: CoreInput) -> Result<(Self, Vec<crate::error::LoadWarning>), CoreError> {
        let built = instance_builder::build(&core);
        let (graph, mut warnings) = DependencyGraph::build(&core, &built.instances)?;
        warnings.extend(built.warnings);

        let reverse_topo = graph.reverse_topo_order()?;
        let critical_path = priority::critical_path_remainder(&graph, &built.instances, &reverse_topo);

        let clock = Clock::default();
        let calendar = Calendar::new(clock);
        Ok((
            Self {
                core,
                instances: built.instances,
                graph,
                clock,
                calendar,
                late_part_delay: LatePartDelay::default(),
                critical_path,
            },
            warnings,
        ))
    }

    fn now(&self) -> NaiveDate {
        self.clock.epoch().date()
    }

    fn priority_of(&self, key: NodeKey) -> f64 {
        let instance = &self.instances[&key];
        priority::priority_of(key, instance, &self.core, &self.graph, &self.critical_path, self.now())
    }
}

/// Per-team mutable capacity, distinct from the team's shift set.
#[derive(Debug, Clone)]
pub struct CapacityOverlay {
    pub mechanic: HashMap<String, u32>,
    pub quality: HashMap<String, u32>,
}

impl CapacityOverlay {
    pub fn from_teams(mechanic: &[Team], quality: &[Team]) -> Self {
        Self {
            mechanic: mechanic.iter().map(|t| (t.name.clone(), t.capacity)).collect(),
            quality: quality.iter().map(|t| (t.name.clone(), t.capacity)).collect(),
        }
    }

    pub fn capacity_of(&self, team: &str) -> Option<u32> {
        self.mechanic.get(team).or_else(|| self.quality.get(team)).copied()
    }
}

/// Outcome of one scheduler run.
#[derive(Debug, Default)]
pub struct ScheduleRun {
    pub assignments: HashMap<NodeKey, ScheduledAssignment>,
    pub failed: HashSet<NodeKey>,
}

impl ScheduleRun {
    pub fn is_scheduled(&self, key: NodeKey) -> bool {
        self.assignments.contains_key(&key)
    }

    pub fn is_resolved(&self, key: NodeKey) -> bool {
        self.assignments.contains_key(&key) || self.failed.contains(&key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapKey {
    priority: f64,
    seq: u64,
}

impl Eq for HeapKey {}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; we want the lowest priority first, so
        // reverse the comparison (stable tiebreak on insertion sequence).
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    key: HeapKey,
    node: NodeKey,
}

impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Drives one forward-scheduling pass over a [`SchedulingInput`] with a
/// given capacity overlay.
pub struct Scheduler<'a> {
    input: &'a SchedulingInput,
    overlay: &'a CapacityOverlay,
    timelines: HashMap<String, TeamTimeline>,
    seq: u64,
}

impl<'a> Scheduler<'a> {
    pub fn new(input: &'a SchedulingInput, overlay: &'a CapacityOverlay) -> Self {
        Self {
            input,
            overlay,
            timelines: HashMap::new(),
            seq: 0,
        }
    }

    pub fn run(mut self) -> ScheduleRun {
        let mut run = ScheduleRun::default();
        let mut retry_counts: HashMap<NodeKey, u32> = HashMap::new();
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();

        for &root in &self.input.graph.roots() {
            self.push(&mut heap, root);
        }

        let total_nodes = self.input.instances.len();
        let mut iterations = 0usize;

        while let Some(entry) = heap.pop() {
            iterations += 1;
            if iterations > total_nodes * ITERATION_FACTOR {
                tracing::warn!(iterations, "scheduler iteration cap reached");
                break;
            }

            let node = entry.node;
            if run.is_resolved(node) {
                continue;
            }
            let retries = *retry_counts.get(&node).unwrap_or(&0);
            if retries >= MAX_RETRIES {
                run.failed.insert(node);
                self.wake_dependents(&mut heap, &run, node);
                continue;
            }

            match self.try_schedule(node, &run) {
                Some(assignment) => {
                    self.reserve(&assignment);
                    run.assignments.insert(node, assignment);
                    self.wake_dependents(&mut heap, &run, node);
                }
                None => {
                    let count = retry_counts.entry(node).or_insert(0);
                    *count += 1;
                    if *count >= MAX_RETRIES {
                        tracing::warn!(?node, "task permanently failed after retries");
                        run.failed.insert(node);
                        self.wake_dependents(&mut heap, &run, node);
                    } else {
                        tracing::debug!(?node, retry = *count, "requeuing with penalty");
                        let base = self.input.priority_of(node);
                        self.push_with_priority(&mut heap, node, base + 0.1 * (*count as f64));
                    }
                }
            }
        }

        run
    }

    fn push(&mut self, heap: &mut BinaryHeap<HeapEntry>, node: NodeKey) {
        let priority = self.input.priority_of(node);
        self.push_with_priority(heap, node, priority);
    }

    fn push_with_priority(&mut self, heap: &mut BinaryHeap<HeapEntry>, node: NodeKey, priority: f64) {
        let seq = self.seq;
        self.seq += 1;
        heap.push(HeapEntry {
            key: HeapKey { priority, seq },
            node,
        });
    }

    fn wake_dependents(&mut self, heap: &mut BinaryHeap<HeapEntry>, run: &ScheduleRun, node: NodeKey) {
        let dependents = self.input.graph.successors(node);
        let ready: Vec<NodeKey> = dependents
            .into_iter()
            .filter(|&dep| {
                !run.is_resolved(dep)
                    && self
                        .input
                        .graph
                        .predecessors(dep)
                        .into_iter()
                        .all(|p| run.is_resolved(p))
            })
            .collect();
        for dep in ready {
            self.push(heap, dep);
        }
    }

    fn reserve(&mut self, assignment: &ScheduledAssignment) {
        let start = assignment.start.value().round() as i64;
        let end = assignment.end.value().round() as i64;
        self.timelines
            .entry(assignment.team.clone())
            .or_default()
            .reserve(start, end, assignment.crew as i32);
    }

    fn earliest_from_predecessors(&self, node: NodeKey, run: &ScheduleRun, mut earliest: Quantity<Minute>) -> Quantity<Minute> {
        for edge in self.input.graph.in_edges(node) {
            if let Some(assignment) = run.assignments.get(&edge.from) {
                if edge.relation == Relation::FinishEqStart {
                    earliest = assignment.end;
                } else if assignment.end.value() > earliest.value() {
                    earliest = assignment.end;
                }
            }
        }
        earliest
    }

    fn try_schedule(&mut self, node: NodeKey, run: &ScheduleRun) -> Option<ScheduledAssignment> {
        let instance = &self.input.instances[&node];
        let product = self.input.core.product_by_index(node.product)?;

        let mut earliest = Quantity::<Minute>::new(0.0);
        if instance.kind == TaskKind::LatePart {
            if let Some(on_dock) = instance.on_dock_date {
                let gated = self.input.calendar.add_days(on_dock, self.input.late_part_delay.0);
                let floored = self.input.calendar.snap_to_six_am(gated);
                if floored.value() > earliest.value() {
                    earliest = floored;
                }
            }
        }
        earliest = self.earliest_from_predecessors(node, run, earliest);

        if instance.kind == TaskKind::QualityInspection {
            self.schedule_quality(node, instance.duration_min, instance.crew, product, earliest)
        } else {
            let team_name = instance.team.clone()?;
            self.schedule_fixed_team(node, &team_name, instance.duration_min, instance.crew, product, earliest)
        }
    }

    fn schedule_fixed_team(
        &mut self,
        node: NodeKey,
        team_name: &str,
        duration_min: u32,
        crew: u32,
        product: &crate::model::Product,
        earliest: Quantity<Minute>,
    ) -> Option<ScheduledAssignment> {
        let team = self.find_team(team_name)?.clone();
        let capacity = self.overlay.capacity_of(team_name)?;
        let (start, shift) = self.search_feasible_start(&team, capacity, crew, duration_min, product, earliest)?;
        Some(ScheduledAssignment {
            key: node,
            start,
            end: start + Quantity::<Minute>::new(duration_min as f64),
            team: team_name.to_string(),
            shift,
            crew,
        })
    }

    fn schedule_quality(
        &mut self,
        node: NodeKey,
        duration_min: u32,
        crew: u32,
        product: &crate::model::Product,
        earliest: Quantity<Minute>,
    ) -> Option<ScheduledAssignment> {
        let mut best: Option<(Quantity<Minute>, Shift, String, f64)> = None;

        for &shift in &Shift::ALL {
            let Some((team, load)) = self.least_loaded_quality_team(shift, crew) else {
                continue;
            };
            let Some(team_def) = self.find_team(&team).cloned() else {
                continue;
            };
            let Some(capacity) = self.overlay.capacity_of(&team) else {
                continue;
            };
            if let Some((start, actual_shift)) =
                self.search_feasible_start(&team_def, capacity, crew, duration_min, product, earliest)
            {
                let better = match &best {
                    None => true,
                    Some((best_start, _, _, best_load)) => {
                        start.value() < best_start.value()
                            || (start.value() == best_start.value() && load < *best_load)
                    }
                };
                if better {
                    best = Some((start, actual_shift, team, load));
                }
            }
        }

        let (start, shift, team, _) = best?;
        Some(ScheduledAssignment {
            key: node,
            start,
            end: start + Quantity::<Minute>::new(duration_min as f64),
            team,
            shift,
            crew,
        })
    }

    fn least_loaded_quality_team(&self, shift: Shift, crew: u32) -> Option<(String, f64)> {
        self.input
            .core
            .quality_teams
            .iter()
            .filter(|t| t.works(shift))
            .filter(|t| self.overlay.capacity_of(&t.name).unwrap_or(0) >= crew)
            .map(|t| (t.name.clone(), self.team_load_minutes(&t.name)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn team_load_minutes(&self, team: &str) -> f64 {
        // Scheduled-minutes * crew, summed, used as the load metric for
        // picking the least-loaded quality team; derived from the
        // timeline's reservation events rather than re-scanning the
        // assignment map.
        self.timelines
            .get(team)
            .map(|t| t.total_reserved_minute_crew())
            .unwrap_or(0.0)
    }

    fn find_team(&self, name: &str) -> Option<&Team> {
        self.input
            .core
            .mechanic_teams
            .iter()
            .chain(self.input.core.quality_teams.iter())
            .find(|t| t.name == name)
    }

    /// Advances `earliest` to the next minute satisfying working day, shift
    /// and capacity.
    fn search_feasible_start(
        &self,
        team: &Team,
        capacity: u32,
        crew: u32,
        duration_min: u32,
        product: &crate::model::Product,
        earliest: Quantity<Minute>,
    ) -> Option<(Quantity<Minute>, Shift)> {
        let shifts: Vec<Shift> = team.shifts.iter().copied().collect();
        let mut candidate = earliest;
        let calendar = &self.input.calendar;
        let timeline = self.timelines.get(&team.name);

        for _ in 0..MAX_MINUTE_STEPS {
            if !calendar.is_working_minute(candidate, product) {
                let next_day = calendar.add_days(calendar.date_of(candidate), 1);
                candidate = calendar.snap_to_six_am(next_day);
                continue;
            }
            let Some(shift) = calendar.shift_covering(candidate, &shifts) else {
                candidate = candidate + Quantity::<Minute>::new(1.0);
                continue;
            };

            let start_m = candidate.value().round() as i64;
            let end_m = start_m + duration_min as i64;
            let fits = timeline
                .map(|t| t.can_fit(start_m, end_m, crew as i32, capacity as i32))
                .unwrap_or(crew <= capacity);
            if fits {
                return Some((candidate, shift));
            }
            candidate = candidate + Quantity::<Minute>::new(1.0);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use std::collections::BTreeSet;

    fn single_task_input() -> CoreInput {
        let mut input = CoreInput::default();
        input.products.push(Product {
            product_id: "A".into(),
            delivery_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            incomplete_range: (1, 1),
            holidays: BTreeSet::new(),
        });
        input.task_templates.push(TaskTemplate {
            task_num: 1,
            duration_min: 60,
            team: "M".into(),
            crew: 1,
        });
        let mut shifts = BTreeSet::new();
        shifts.insert(Shift::S1);
        input.mechanic_teams.push(Team::new("M".into(), TeamKind::Mechanic, 1, shifts));
        input
    }

    #[test]
    fn single_task_schedules_at_epoch() {
        let core = single_task_input();
        let (scheduling_input, warnings) = SchedulingInput::build(core).unwrap();
        assert!(warnings.is_empty());
        let overlay = CapacityOverlay::from_teams(&scheduling_input.core.mechanic_teams, &scheduling_input.core.quality_teams);
        let run = Scheduler::new(&scheduling_input, &overlay).run();
        let assignment = &run.assignments[&NodeKey::new(0, 1)];
        assert_eq!(assignment.start.value(), 0.0);
        assert_eq!(assignment.end.value(), 60.0);
        assert_eq!(assignment.shift, Shift::S1);
    }

    #[test]
    fn capacity_one_serializes_two_independent_tasks() {
        let mut core = single_task_input();
        core.products[0].incomplete_range = (1, 2);
        core.task_templates.push(TaskTemplate {
            task_num: 2,
            duration_min: 120,
            team: "M".into(),
            crew: 1,
        });
        core.task_templates[0].duration_min = 120;
        let (scheduling_input, _) = SchedulingInput::build(core).unwrap();
        let overlay = CapacityOverlay::from_teams(&scheduling_input.core.mechanic_teams, &scheduling_input.core.quality_teams);
        let run = Scheduler::new(&scheduling_input, &overlay).run();
        let a = &run.assignments[&NodeKey::new(0, 1)];
        let b = &run.assignments[&NodeKey::new(0, 2)];
        let (first, second) = if a.start.value() < b.start.value() { (a, b) } else { (b, a) };
        assert_eq!(first.start.value(), 0.0);
        assert_eq!(first.end.value(), 120.0);
        assert_eq!(second.start.value(), 120.0);
    }
}
