//! CSV ingestion: a single file holding one section per table, each
//! introduced by a `====Section Name====` marker line.
//!
//! The scheduling core never depends on this module — it only produces a
//! [`CoreInput`] plus [`LoadWarning`]s for [`SchedulingInput`] to consume.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{LoadError, LoadWarning};
use crate::model::{
    CoreInput, LatePartConstraint, Product, QualityInspectionSpec, RawPrecedenceEdge, Relation,
    ReworkConstraint, Shift, Team, TeamKind, TaskDetail, TaskTemplate,
};

const TASK_TEMPLATES: &str = "TASK DURATION AND RESOURCE TABLE";
const PRODUCT_JOBS: &str = "PRODUCT LINE JOBS";
const TASK_RELATIONSHIPS: &str = "TASK RELATIONSHIPS TABLE";
const LATE_PARTS: &str = "LATE PARTS RELATIONSHIPS TABLE";
const LATE_PART_DETAILS: &str = "LATE PARTS TASK DETAILS";
const REWORK_RELATIONSHIPS: &str = "REWORK RELATIONSHIPS TABLE";
const REWORK_DETAILS: &str = "REWORK TASK DETAILS";
const QUALITY_REQUIREMENTS: &str = "QUALITY INSPECTION REQUIREMENTS";
const MECHANIC_CALENDARS: &str = "MECHANIC TEAM WORKING CALENDARS";
const QUALITY_CALENDARS: &str = "QUALITY TEAM WORKING CALENDARS";
const MECHANIC_CAPACITY: &str = "MECHANIC TEAM CAPACITY";
const QUALITY_CAPACITY: &str = "QUALITY TEAM CAPACITY";
const DELIVERY_SCHEDULE: &str = "PRODUCT LINE DELIVERY SCHEDULE";
const HOLIDAY_CALENDAR: &str = "PRODUCT LINE HOLIDAY CALENDAR";

/// Reads `path` and builds a [`CoreInput`], accumulating a [`LoadWarning`]
/// for every malformed or dangling row instead of failing the whole load.
pub fn load_core_input(path: &Path) -> Result<(CoreInput, Vec<LoadWarning>), LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_core_input_str(&content)
}

/// Same as [`load_core_input`] but over an in-memory string, used directly
/// by tests and by callers that already hold the file contents.
pub fn load_core_input_str(content: &str) -> Result<(CoreInput, Vec<LoadWarning>), LoadError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let sections = parse_sections(content);
    let mut warnings = Vec::new();

    let task_templates = load_task_templates(&sections, &mut warnings)?;

    let (mut products, incomplete_ranges) = load_product_jobs(&sections, &mut warnings)?;
    load_delivery_dates(&sections, &mut products, &mut warnings)?;
    load_holidays(&sections, &mut products, &mut warnings)?;

    let precedence_edges = load_precedence_edges(&sections, &mut warnings)?;
    let late_parts = load_late_parts(&sections, &incomplete_ranges, &mut warnings)?;
    let late_part_details = load_task_details(&sections, LATE_PART_DETAILS, &mut warnings)?;
    let rework = load_rework(&sections, &incomplete_ranges, &mut warnings)?;
    let rework_details = load_task_details(&sections, REWORK_DETAILS, &mut warnings)?;
    let quality_inspections = load_quality_inspections(&sections, &mut warnings)?;

    let mechanic_calendars = load_shift_assignments(&sections, MECHANIC_CALENDARS, "Mechanic Team", &mut warnings)?;
    let quality_calendars = load_shift_assignments(&sections, QUALITY_CALENDARS, "Quality Team", &mut warnings)?;
    let mechanic_capacity = load_capacity(&sections, MECHANIC_CAPACITY, "Mechanic Team", &mut warnings)?;
    let quality_capacity = load_capacity(&sections, QUALITY_CAPACITY, "Quality Team", &mut warnings)?;

    let mechanic_teams = build_teams(TeamKind::Mechanic, &mechanic_calendars, &mechanic_capacity);
    let quality_teams = build_teams(TeamKind::Quality, &quality_calendars, &quality_capacity);

    Ok((
        CoreInput {
            task_templates,
            products,
            precedence_edges,
            late_parts,
            late_part_details,
            rework,
            rework_details,
            quality_inspections,
            mechanic_teams,
            quality_teams,
        },
        warnings,
    ))
}

/// Splits `content` on `====Section Name====` marker lines: any line whose
/// stripped form starts with `====` ends the current section and starts a
/// new one named by the marker line with every `=` character removed.
fn parse_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_section: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();

    let flush = |sections: &mut HashMap<String, String>, name: &Option<String>, lines: &mut Vec<&str>| {
        if let Some(name) = name {
            if !lines.is_empty() {
                sections.insert(name.clone(), lines.join("\n"));
            }
        }
        lines.clear();
    };

    for line in content.trim().lines() {
        if line.trim().starts_with("====") {
            flush(&mut sections, &current_section, &mut current_lines);
            current_section = Some(line.replace('=', "").trim().to_string());
        } else if !line.trim().is_empty() {
            current_lines.push(line);
        }
    }
    flush(&mut sections, &current_section, &mut current_lines);
    sections
}

fn csv_reader(section: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(section.as_bytes())
}

fn malformed(warnings: &mut Vec<LoadWarning>, section: &str, detail: impl Into<String>) {
    warnings.push(LoadWarning::MalformedRow {
        section: section.to_string(),
        detail: detail.into(),
    });
}

#[derive(Debug, Deserialize)]
struct TaskTemplateRow {
    #[serde(rename = "Task")]
    task: u32,
    #[serde(rename = "Duration (minutes)")]
    duration: u32,
    #[serde(rename = "Resource Type")]
    team: String,
    #[serde(rename = "Mechanics Required")]
    mechanics_required: u32,
}

fn load_task_templates(
    sections: &HashMap<String, String>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<TaskTemplate>, LoadError> {
    let Some(section) = sections.get(TASK_TEMPLATES) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<TaskTemplateRow>() {
        match result {
            Ok(row) => out.push(TaskTemplate {
                task_num: row.task,
                duration_min: row.duration,
                team: row.team,
                crew: row.mechanics_required,
            }),
            Err(e) => malformed(warnings, TASK_TEMPLATES, e.to_string()),
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct ProductJobRow {
    #[serde(rename = "Product Line")]
    product_line: String,
    #[serde(rename = "Task Start")]
    start: u32,
    #[serde(rename = "Task End")]
    end: u32,
}

fn load_product_jobs(
    sections: &HashMap<String, String>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<(Vec<Product>, HashMap<String, (u32, u32)>), LoadError> {
    let mut products = Vec::new();
    let mut ranges = HashMap::new();
    let Some(section) = sections.get(PRODUCT_JOBS) else {
        return Ok((products, ranges));
    };
    for result in csv_reader(section).deserialize::<ProductJobRow>() {
        match result {
            Ok(row) => {
                ranges.insert(row.product_line.clone(), (row.start, row.end));
                products.push(Product {
                    product_id: row.product_line,
                    // Placeholder; overwritten by `load_delivery_dates` if a
                    // delivery row exists for this product.
                    delivery_date: crate::time::epoch().date(),
                    incomplete_range: (row.start, row.end),
                    holidays: BTreeSet::new(),
                });
            }
            Err(e) => malformed(warnings, PRODUCT_JOBS, e.to_string()),
        }
    }
    Ok((products, ranges))
}

#[derive(Debug, Deserialize)]
struct DeliveryRow {
    #[serde(rename = "Product Line")]
    product_line: String,
    #[serde(rename = "Delivery Date")]
    delivery_date: NaiveDate,
}

fn load_delivery_dates(
    sections: &HashMap<String, String>,
    products: &mut [Product],
    warnings: &mut Vec<LoadWarning>,
) -> Result<(), LoadError> {
    let Some(section) = sections.get(DELIVERY_SCHEDULE) else {
        return Ok(());
    };
    for result in csv_reader(section).deserialize::<DeliveryRow>() {
        match result {
            Ok(row) => {
                if let Some(product) = products.iter_mut().find(|p| p.product_id == row.product_line) {
                    product.delivery_date = row.delivery_date;
                } else {
                    malformed(
                        warnings,
                        DELIVERY_SCHEDULE,
                        format!("delivery date for unknown product {}", row.product_line),
                    );
                }
            }
            Err(e) => malformed(warnings, DELIVERY_SCHEDULE, e.to_string()),
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct HolidayRow {
    #[serde(rename = "Product Line")]
    product_line: String,
    #[serde(rename = "Date")]
    date: NaiveDate,
}

fn load_holidays(
    sections: &HashMap<String, String>,
    products: &mut [Product],
    warnings: &mut Vec<LoadWarning>,
) -> Result<(), LoadError> {
    let Some(section) = sections.get(HOLIDAY_CALENDAR) else {
        return Ok(());
    };
    for result in csv_reader(section).deserialize::<HolidayRow>() {
        match result {
            Ok(row) => {
                if let Some(product) = products.iter_mut().find(|p| p.product_id == row.product_line) {
                    product.holidays.insert(row.date);
                } else {
                    malformed(
                        warnings,
                        HOLIDAY_CALENDAR,
                        format!("holiday for unknown product {}", row.product_line),
                    );
                }
            }
            Err(e) => malformed(warnings, HOLIDAY_CALENDAR, e.to_string()),
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RelationshipRow {
    #[serde(rename = "First")]
    first: u32,
    #[serde(rename = "Second")]
    second: u32,
    #[serde(rename = "Relationship Type", alias = "Relationship")]
    relationship: Option<String>,
}

fn parse_relation(raw: Option<&str>) -> Relation {
    match raw.map(str::trim) {
        Some("Finish = Start") => Relation::FinishEqStart,
        Some("Start <= Start") => Relation::StartLeqStart,
        _ => Relation::FinishLeqStart,
    }
}

fn load_precedence_edges(
    sections: &HashMap<String, String>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<RawPrecedenceEdge>, LoadError> {
    let Some(section) = sections.get(TASK_RELATIONSHIPS) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<RelationshipRow>() {
        match result {
            Ok(row) => out.push(RawPrecedenceEdge {
                first: row.first,
                second: row.second,
                relation: parse_relation(row.relationship.as_deref()),
            }),
            Err(e) => malformed(warnings, TASK_RELATIONSHIPS, e.to_string()),
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct LatePartRow {
    #[serde(rename = "First")]
    first: u32,
    #[serde(rename = "Second")]
    second: u32,
    #[serde(rename = "Estimated On Dock Date")]
    on_dock: NaiveDate,
    #[serde(rename = "Product Line")]
    product_line: Option<String>,
}

fn load_late_parts(
    sections: &HashMap<String, String>,
    incomplete_ranges: &HashMap<String, (u32, u32)>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<LatePartConstraint>, LoadError> {
    let Some(section) = sections.get(LATE_PARTS) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<LatePartRow>() {
        match result {
            Ok(row) => {
                let product = row.product_line.filter(|p| !p.trim().is_empty());
                if let Some(product) = &product {
                    if !in_range(incomplete_ranges, product, row.second) {
                        warnings.push(LoadWarning::UnknownLatePartDependent { task_num: row.second });
                        continue;
                    }
                }
                out.push(LatePartConstraint {
                    first: row.first,
                    second: row.second,
                    on_dock: row.on_dock,
                    product,
                });
            }
            Err(e) => malformed(warnings, LATE_PARTS, e.to_string()),
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct ReworkRow {
    #[serde(rename = "First")]
    first: u32,
    #[serde(rename = "Second")]
    second: u32,
    #[serde(rename = "Relationship Type", alias = "Relationship")]
    relationship: Option<String>,
    #[serde(rename = "Product Line")]
    product_line: Option<String>,
}

fn load_rework(
    sections: &HashMap<String, String>,
    incomplete_ranges: &HashMap<String, (u32, u32)>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<ReworkConstraint>, LoadError> {
    let Some(section) = sections.get(REWORK_RELATIONSHIPS) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<ReworkRow>() {
        match result {
            Ok(row) => {
                let product = row.product_line.filter(|p| !p.trim().is_empty());
                if let Some(product) = &product {
                    if !in_range(incomplete_ranges, product, row.second) {
                        warnings.push(LoadWarning::UnknownReworkSuccessor { task_num: row.second });
                        continue;
                    }
                }
                out.push(ReworkConstraint {
                    first: row.first,
                    second: row.second,
                    relation: parse_relation(row.relationship.as_deref()),
                    product,
                });
            }
            Err(e) => malformed(warnings, REWORK_RELATIONSHIPS, e.to_string()),
        }
    }
    Ok(out)
}

fn in_range(ranges: &HashMap<String, (u32, u32)>, product: &str, task_num: u32) -> bool {
    ranges
        .get(product)
        .map(|&(lo, hi)| (lo..=hi).contains(&task_num))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct TaskDetailRow {
    #[serde(rename = "Task")]
    task: u32,
    #[serde(rename = "Duration (minutes)")]
    duration: u32,
    #[serde(rename = "Resource Type")]
    team: String,
    #[serde(rename = "Mechanics Required")]
    mechanics_required: u32,
}

fn load_task_details(
    sections: &HashMap<String, String>,
    section_name: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<TaskDetail>, LoadError> {
    let Some(section) = sections.get(section_name) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<TaskDetailRow>() {
        match result {
            Ok(row) => out.push(TaskDetail {
                task_num: row.task,
                duration_min: row.duration,
                team: row.team,
                crew: row.mechanics_required,
            }),
            Err(e) => malformed(warnings, section_name, e.to_string()),
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct QualityInspectionRow {
    #[serde(rename = "Primary Task")]
    primary_task: u32,
    #[serde(rename = "Quality Task")]
    quality_task: u32,
    #[serde(rename = "Quality Duration (minutes)")]
    duration: u32,
    #[serde(rename = "Quality Headcount Required")]
    headcount: u32,
}

fn load_quality_inspections(
    sections: &HashMap<String, String>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<QualityInspectionSpec>, LoadError> {
    let Some(section) = sections.get(QUALITY_REQUIREMENTS) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for result in csv_reader(section).deserialize::<QualityInspectionRow>() {
        match result {
            Ok(row) => out.push(QualityInspectionSpec {
                primary_task_num: row.primary_task,
                qi_task_num: row.quality_task,
                duration_min: row.duration,
                crew: row.headcount,
            }),
            Err(e) => malformed(warnings, QUALITY_REQUIREMENTS, e.to_string()),
        }
    }
    Ok(out)
}

/// Parses a `"All 3 shifts"` / `"1st and 2nd"` / `"3rd"` cell into the
/// shifts it names.
fn parse_shift_list(raw: &str) -> BTreeSet<Shift> {
    let mut shifts = BTreeSet::new();
    if raw.contains("All 3 shifts") {
        shifts.insert(Shift::S1);
        shifts.insert(Shift::S2);
        shifts.insert(Shift::S3);
        return shifts;
    }
    for part in raw.split("and") {
        let part = part.trim();
        if part.starts_with("1st") {
            shifts.insert(Shift::S1);
        } else if part.starts_with("2nd") {
            shifts.insert(Shift::S2);
        } else if part.starts_with("3rd") {
            shifts.insert(Shift::S3);
        }
    }
    shifts
}

fn load_shift_assignments(
    sections: &HashMap<String, String>,
    section_name: &str,
    team_column: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Result<BTreeMap<String, BTreeSet<Shift>>, LoadError> {
    let mut out = BTreeMap::new();
    let Some(section) = sections.get(section_name) else {
        return Ok(out);
    };
    let mut reader = csv_reader(section);
    let headers = reader.headers().map_err(|source| LoadError::Csv {
        section: section_name.to_string(),
        source,
    })?;
    let team_idx = headers.iter().position(|h| h == team_column);
    let shift_idx = headers.iter().position(|h| h == "Working Shifts");

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                malformed(warnings, section_name, e.to_string());
                continue;
            }
        };
        match (team_idx.and_then(|i| record.get(i)), shift_idx.and_then(|i| record.get(i))) {
            (Some(team), Some(shifts)) => {
                out.insert(team.trim().to_string(), parse_shift_list(shifts));
            }
            _ => malformed(warnings, section_name, "missing team or shift column"),
        }
    }
    Ok(out)
}

fn load_capacity(
    sections: &HashMap<String, String>,
    section_name: &str,
    team_column: &str,
    warnings: &mut Vec<LoadWarning>,
) -> Result<BTreeMap<String, u32>, LoadError> {
    let mut out = BTreeMap::new();
    let Some(section) = sections.get(section_name) else {
        return Ok(out);
    };
    let mut reader = csv_reader(section);
    let headers = reader.headers().map_err(|source| LoadError::Csv {
        section: section_name.to_string(),
        source,
    })?;
    let team_idx = headers.iter().position(|h| h == team_column);
    let cap_idx = headers.iter().position(|h| h == "Total Capacity (People)");

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                malformed(warnings, section_name, e.to_string());
                continue;
            }
        };
        let team = team_idx.and_then(|i| record.get(i)).map(str::trim);
        let capacity = cap_idx.and_then(|i| record.get(i)).and_then(|v| v.trim().parse::<u32>().ok());
        match (team, capacity) {
            (Some(team), Some(capacity)) => {
                out.insert(team.to_string(), capacity);
            }
            _ => malformed(warnings, section_name, "missing or non-numeric capacity"),
        }
    }
    Ok(out)
}

fn build_teams(
    kind: TeamKind,
    calendars: &BTreeMap<String, BTreeSet<Shift>>,
    capacity: &BTreeMap<String, u32>,
) -> Vec<Team> {
    let mut names: BTreeSet<&String> = calendars.keys().collect();
    names.extend(capacity.keys());
    names
        .into_iter()
        .map(|name| {
            let shifts = calendars.get(name).cloned().unwrap_or_default();
            let cap = capacity.get(name).copied().unwrap_or(0);
            Team::new(name.clone(), kind, cap, shifts)
        })
        .collect()
}
