//! Core data model: task templates, products, instances, edges, teams and
//! shifts, and the scheduler's output record. No generic `Task<A>`/
//! `Resource<A>` traits here: every instance is a single concrete flavor of
//! task, and this domain's attribute set is fixed.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use qtty::{Minute, Quantity};

/// Crate-wide identifier type.
pub type Id = String;

/// Compact internal key for a task instance: `(product_index, task_num)`.
///
/// The `+10000` offset on `task_num` is reserved for a quality-inspection
/// companion of the task numbered `task_num - 10000`. String identifiers
/// only exist at the [`crate::boundary`] layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub product: u32,
    pub task_num: u32,
}

impl NodeKey {
    pub const QI_OFFSET: u32 = 10000;

    pub const fn new(product: u32, task_num: u32) -> Self {
        Self { product, task_num }
    }

    /// Returns the key of this node's quality-inspection companion.
    pub const fn qi_key(self) -> Self {
        Self {
            product: self.product,
            task_num: self.task_num + Self::QI_OFFSET,
        }
    }

    /// True if this key denotes a quality-inspection node.
    pub const fn is_qi(self) -> bool {
        self.task_num >= Self::QI_OFFSET
    }

    /// The primary task number this QI node inspects, if this is a QI node.
    pub const fn primary_task_num(self) -> Option<u32> {
        if self.is_qi() {
            Some(self.task_num - Self::QI_OFFSET)
        } else {
            None
        }
    }
}

/// What kind of task an instance is; drives fixed priority bands and
/// team-resolution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Production,
    LatePart,
    Rework,
    QualityInspection,
}

/// Immutable task definition shared by every product that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    pub task_num: u32,
    pub duration_min: u32,
    pub team: Id,
    pub crew: u32,
}

/// A product line going through the shop: its delivery commitment, the
/// range of template task numbers it still needs, and its holiday set.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: Id,
    pub delivery_date: NaiveDate,
    pub incomplete_range: (u32, u32),
    pub holidays: BTreeSet<NaiveDate>,
}

impl Product {
    pub fn is_incomplete(&self, task_num: u32) -> bool {
        let (lo, hi) = self.incomplete_range;
        (lo..=hi).contains(&task_num)
    }

    /// True if `date` is a scheduling working day for this product: a
    /// weekday that is not in the product's holiday set.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        let weekday = date.weekday();
        let is_weekend = matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun);
        !is_weekend && !self.holidays.contains(&date)
    }
}

/// A single schedulable unit: a template instantiated against a product, or
/// a late-part/rework/quality-inspection entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInstance {
    pub key: NodeKey,
    pub duration_min: u32,
    /// Fixed for Production/LatePart/Rework; `None` for QI until the
    /// scheduler resolves the least-loaded quality team.
    pub team: Option<Id>,
    pub crew: u32,
    pub kind: TaskKind,
    pub on_dock_date: Option<NaiveDate>,
    pub primary_task_ref: Option<NodeKey>,
}

impl TaskInstance {
    pub fn product(&self) -> u32 {
        self.key.product
    }
}

/// Precedence relationship between two task instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `successor.start >= predecessor.end`.
    FinishLeqStart,
    /// `successor.start == predecessor.end` (tight).
    FinishEqStart,
    /// `successor.start >= predecessor.start`.
    StartLeqStart,
}

impl Relation {
    /// The boundary-interface literal form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Relation::FinishLeqStart => "Finish <= Start",
            Relation::FinishEqStart => "Finish = Start",
            Relation::StartLeqStart => "Start <= Start",
        }
    }
}

/// Where a precedence edge came from, kept for diagnostics and for the QI
/// redirection rules in [`crate::dependency_graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeOrigin {
    Baseline,
    LatePart,
    Rework,
    Quality,
}

/// An edge in the dynamic dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrecedenceEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub relation: Relation,
    pub origin: EdgeOrigin,
}

/// Whether a team performs mechanic work or quality inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamKind {
    Mechanic,
    Quality,
}

/// One of the three fixed shift windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shift {
    S1,
    S2,
    S3,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::S1, Shift::S2, Shift::S3];

    /// Start/end of this shift in minutes-of-day, `[start, end)`. S3 wraps
    /// past midnight, represented here as `end > 1440`.
    pub const fn minute_range(self) -> (u32, u32) {
        match self {
            Shift::S1 => (360, 870),
            Shift::S2 => (870, 1380),
            Shift::S3 => (1380, 1440 + 360),
        }
    }

    /// True if minute-of-day `m` (in `[0, 1440)`) falls in this shift.
    pub const fn covers_minute_of_day(self, m: u32) -> bool {
        let (start, end) = self.minute_range();
        if end <= 1440 {
            m >= start && m < end
        } else {
            m >= start || m < end - 1440
        }
    }
}

/// A named team with mutable capacity (optimizers adjust it between runs)
/// and the shifts it works.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub name: Id,
    pub kind: TeamKind,
    pub capacity: u32,
    pub original_capacity: u32,
    pub shifts: BTreeSet<Shift>,
}

impl Team {
    pub fn new(name: Id, kind: TeamKind, capacity: u32, shifts: BTreeSet<Shift>) -> Self {
        Self {
            name,
            kind,
            capacity,
            original_capacity: capacity,
            shifts,
        }
    }

    pub fn works(&self, shift: Shift) -> bool {
        self.shifts.contains(&shift)
    }
}

/// The scheduler's placement of one task instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAssignment {
    pub key: NodeKey,
    pub start: Quantity<Minute>,
    pub end: Quantity<Minute>,
    pub team: Id,
    pub shift: Shift,
    /// Headcount this assignment reserves on `team`, needed internally to
    /// reserve a [`crate::capacity::TeamTimeline`] and to compute
    /// quality-team load without a second lookup.
    pub crew: u32,
}

impl ScheduledAssignment {
    pub fn duration(&self) -> Quantity<Minute> {
        self.end - self.start
    }
}

/// A late-part arrival record: task `first` gates task `second` for
/// `product` (or every product with `second` incomplete, if `product` is
/// `None`), not before `on_dock + delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct LatePartConstraint {
    pub first: u32,
    pub second: u32,
    pub on_dock: NaiveDate,
    pub product: Option<Id>,
}

/// A rework constraint, structurally identical to a late-part constraint
/// but without an on-dock date.
#[derive(Debug, Clone, PartialEq)]
pub struct ReworkConstraint {
    pub first: u32,
    pub second: u32,
    pub relation: Relation,
    pub product: Option<Id>,
}

/// Attributes for a late-part or rework task, keyed by its task number:
/// duration, team and crew come from this table rather than the baseline
/// task template.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetail {
    pub task_num: u32,
    pub duration_min: u32,
    pub team: Id,
    pub crew: u32,
}

/// A quality-inspection table row.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityInspectionSpec {
    pub primary_task_num: u32,
    pub qi_task_num: u32,
    pub duration_min: u32,
    pub crew: u32,
}

/// A raw precedence-table row, prior to QI redirection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrecedenceEdge {
    pub first: u32,
    pub second: u32,
    pub relation: Relation,
}

/// Everything the scheduling core needs, assembled by the loader or a test
/// fixture. Immutable once built; optimizers only ever mutate the capacity
/// fields inside [`Team`] values held elsewhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoreInput {
    pub task_templates: Vec<TaskTemplate>,
    pub products: Vec<Product>,
    pub precedence_edges: Vec<RawPrecedenceEdge>,
    pub late_parts: Vec<LatePartConstraint>,
    pub late_part_details: Vec<TaskDetail>,
    pub rework: Vec<ReworkConstraint>,
    pub rework_details: Vec<TaskDetail>,
    pub quality_inspections: Vec<QualityInspectionSpec>,
    pub mechanic_teams: Vec<Team>,
    pub quality_teams: Vec<Team>,
}

impl CoreInput {
    pub fn product_index(&self, product_id: &str) -> Option<u32> {
        self.products
            .iter()
            .position(|p| p.product_id == product_id)
            .map(|i| i as u32)
    }

    pub fn product_by_index(&self, index: u32) -> Option<&Product> {
        self.products.get(index as usize)
    }
}
