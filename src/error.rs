//! Error and warning taxonomy: `thiserror`-derived enums, `Clone + PartialEq
//! + Eq` where the payload allows it.

use thiserror::Error;

use crate::model::NodeKey;

/// Fatal data error out of [`crate::dependency_graph::DependencyGraph::build`]
/// or [`crate::loader`]. Nothing else in the scheduling core returns `Err`
/// once the graph is built successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cycle was found in the dynamic dependency graph. Carries the full
    /// cycle as discovered by DFS so it can be printed.
    #[error("dependency cycle detected: {}", format_cycle(.0))]
    Cycle(Vec<NodeKey>),

    /// The input contained no task instances to schedule.
    #[error("no task instances to schedule")]
    EmptyInput,
}

fn format_cycle(cycle: &[NodeKey]) -> String {
    cycle
        .iter()
        .map(|k| format!("({}, {})", k.product, k.task_num))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A fatal loader-level error: malformed input structure, not a single bad
/// row (those become [`LoadWarning`]s instead).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in section {section}: {source}")]
    Csv {
        section: String,
        #[source]
        source: csv::Error,
    },

    #[error("missing required section: {0}")]
    MissingSection(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// A non-fatal problem with a single input row: the row is skipped and the
/// instance builder/loader keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    #[error("task template {task_num} referenced by product {product} not found")]
    MissingTemplate { product: String, task_num: u32 },

    #[error("late part row references unknown dependent task {task_num}")]
    UnknownLatePartDependent { task_num: u32 },

    #[error("rework row references unknown successor task {task_num}")]
    UnknownReworkSuccessor { task_num: u32 },

    #[error("quality inspection row references unknown primary task {task_num}")]
    UnknownQualityPrimary { task_num: u32 },

    #[error("malformed row in section {section}: {detail}")]
    MalformedRow { section: String, detail: String },

    #[error("precedence edge ({first}, {second}) has no live endpoint on one or both sides")]
    DanglingPrecedenceEdge { first: u32, second: u32 },

    #[error("task instance ({product}, {task_num}) is unreachable from any root")]
    UnreachableInstance { product: String, task_num: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_formats_full_path() {
        let err = CoreError::Cycle(vec![
            NodeKey::new(0, 1),
            NodeKey::new(0, 2),
            NodeKey::new(0, 3),
            NodeKey::new(0, 1),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("(0, 1) -> (0, 2) -> (0, 3) -> (0, 1)"));
    }

    #[test]
    fn warnings_are_comparable() {
        let a = LoadWarning::MissingTemplate {
            product: "A".into(),
            task_num: 5,
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
