//! Expands task templates against per-product incomplete-task ranges into
//! uniquely-keyed task instances, then attaches late-part, rework and
//! quality-inspection companions.

use std::collections::HashMap;

use crate::error::LoadWarning;
use crate::model::{CoreInput, NodeKey, TaskInstance, TaskKind};

/// The full set of task instances built from one [`CoreInput`], plus any
/// non-fatal warnings accumulated along the way.
#[derive(Debug, Default)]
pub struct BuiltInstances {
    pub instances: HashMap<NodeKey, TaskInstance>,
    pub warnings: Vec<LoadWarning>,
}

pub fn build(input: &CoreInput) -> BuiltInstances {
    let mut instances = HashMap::new();
    let mut warnings = Vec::new();

    let templates: HashMap<u32, &crate::model::TaskTemplate> = input
        .task_templates
        .iter()
        .map(|t| (t.task_num, t))
        .collect();

    build_production_instances(input, &templates, &mut instances, &mut warnings);
    build_detail_backed_instances(
        input,
        &input.late_parts,
        &input.late_part_details,
        TaskKind::LatePart,
        &mut instances,
        &mut warnings,
    );
    build_detail_backed_instances(
        input,
        &input.rework,
        &input.rework_details,
        TaskKind::Rework,
        &mut instances,
        &mut warnings,
    );
    build_quality_inspection_instances(input, &mut instances, &mut warnings);

    BuiltInstances { instances, warnings }
}

fn build_production_instances(
    input: &CoreInput,
    templates: &HashMap<u32, &crate::model::TaskTemplate>,
    instances: &mut HashMap<NodeKey, TaskInstance>,
    warnings: &mut Vec<LoadWarning>,
) {
    for (product_index, product) in input.products.iter().enumerate() {
        let product_index = product_index as u32;
        let (lo, hi) = product.incomplete_range;
        for task_num in lo..=hi {
            match templates.get(&task_num) {
                Some(template) => {
                    let key = NodeKey::new(product_index, task_num);
                    instances.insert(
                        key,
                        TaskInstance {
                            key,
                            duration_min: template.duration_min,
                            team: Some(template.team.clone()),
                            crew: template.crew,
                            kind: TaskKind::Production,
                            on_dock_date: None,
                            primary_task_ref: None,
                        },
                    );
                }
                None => warnings.push(LoadWarning::MissingTemplate {
                    product: product.product_id.clone(),
                    task_num,
                }),
            }
        }
    }
}

/// Common behavior for late-part and rework tables: the same fan-out and
/// detail-lookup rule applies to both.
trait DetailConstraint {
    fn first(&self) -> u32;
    fn second(&self) -> u32;
    fn product(&self) -> Option<&str>;
    fn on_dock(&self) -> Option<chrono::NaiveDate>;
}

impl DetailConstraint for crate::model::LatePartConstraint {
    fn first(&self) -> u32 {
        self.first
    }
    fn second(&self) -> u32 {
        self.second
    }
    fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
    fn on_dock(&self) -> Option<chrono::NaiveDate> {
        Some(self.on_dock)
    }
}

impl DetailConstraint for crate::model::ReworkConstraint {
    fn first(&self) -> u32 {
        self.first
    }
    fn second(&self) -> u32 {
        self.second
    }
    fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
    fn on_dock(&self) -> Option<chrono::NaiveDate> {
        None
    }
}

fn build_detail_backed_instances<C: DetailConstraint>(
    input: &CoreInput,
    constraints: &[C],
    details: &[crate::model::TaskDetail],
    kind: TaskKind,
    instances: &mut HashMap<NodeKey, TaskInstance>,
    warnings: &mut Vec<LoadWarning>,
) {
    let details_by_num: HashMap<u32, &crate::model::TaskDetail> =
        details.iter().map(|d| (d.task_num, d)).collect();

    for constraint in constraints {
        let second = constraint.second();
        let first = constraint.first();

        let target_products: Vec<(u32, &crate::model::Product)> = match constraint.product() {
            Some(product_id) => input
                .products
                .iter()
                .enumerate()
                .filter(|(_, p)| p.product_id == product_id)
                .map(|(i, p)| (i as u32, p))
                .collect(),
            // No explicit product: fan out to every product whose incomplete
            // range contains the dependent task, rather than deduplicating
            // to a single instance.
            None => input
                .products
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_incomplete(second))
                .map(|(i, p)| (i as u32, p))
                .collect(),
        };

        if target_products.is_empty() {
            warnings.push(LoadWarning::UnknownLatePartDependent { task_num: second });
            continue;
        }

        let detail = match details_by_num.get(&first) {
            Some(detail) => *detail,
            None => {
                warnings.push(LoadWarning::MalformedRow {
                    section: "task_details".into(),
                    detail: format!("no detail row for task {first}"),
                });
                continue;
            }
        };

        for (product_index, product) in target_products {
            if !product.is_incomplete(second) {
                continue;
            }
            let dependent_key = NodeKey::new(product_index, second);
            if !instances.contains_key(&dependent_key) {
                continue;
            }
            let key = NodeKey::new(product_index, first);
            instances.insert(
                key,
                TaskInstance {
                    key,
                    duration_min: detail.duration_min,
                    team: Some(detail.team.clone()),
                    crew: detail.crew,
                    kind,
                    on_dock_date: constraint.on_dock(),
                    primary_task_ref: None,
                },
            );
        }
    }
}

fn build_quality_inspection_instances(
    input: &CoreInput,
    instances: &mut HashMap<NodeKey, TaskInstance>,
    warnings: &mut Vec<LoadWarning>,
) {
    for qi in &input.quality_inspections {
        let mut any_primary_live = false;
        let candidate_keys: Vec<NodeKey> = instances
            .keys()
            .copied()
            .filter(|k| {
                k.task_num == qi.primary_task_num
                    && matches!(
                        instances[k].kind,
                        TaskKind::Production | TaskKind::Rework
                    )
            })
            .collect();

        for primary_key in candidate_keys {
            any_primary_live = true;
            let qi_key = primary_key.qi_key();
            instances.insert(
                qi_key,
                TaskInstance {
                    key: qi_key,
                    duration_min: qi.duration_min,
                    team: None,
                    crew: qi.crew,
                    kind: TaskKind::QualityInspection,
                    on_dock_date: None,
                    primary_task_ref: Some(primary_key),
                },
            );
        }

        if !any_primary_live {
            warnings.push(LoadWarning::UnknownQualityPrimary {
                task_num: qi.primary_task_num,
            });
        }
    }
}
