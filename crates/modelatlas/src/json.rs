//! JSON serialization types for models and builder results

use crate::fmb::{FmbResult, FmbStatistics, GaveUpReason};
use crate::logic::Interner;
use crate::model::FiniteModel;
use serde::{Deserialize, Serialize};

/// One defined entry of a function table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntryJson {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<u32>,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionJson {
    pub name: String,
    pub arity: usize,
    pub entries: Vec<FunctionEntryJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateEntryJson {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<u32>,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateJson {
    pub name: String,
    pub arity: usize,
    pub entries: Vec<PredicateEntryJson>,
}

/// JSON representation of a finite model. Entries left open by the search
/// are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelJson {
    /// Size of every distinct sort
    pub sizes: Vec<u32>,
    pub functions: Vec<FunctionJson>,
    pub predicates: Vec<PredicateJson>,
}

impl ModelJson {
    pub fn from_model(model: &FiniteModel, interner: &Interner) -> Self {
        let functions = model
            .functions()
            .map(|(id, table)| FunctionJson {
                name: interner.resolve_function(id).to_string(),
                arity: table.arg_sorts.len(),
                entries: model
                    .function_entries(table)
                    .filter_map(|(args, value)| value.map(|value| FunctionEntryJson { args, value }))
                    .collect(),
            })
            .collect();
        let predicates = model
            .predicates()
            .map(|(id, table)| PredicateJson {
                name: interner.resolve_predicate(id).to_string(),
                arity: table.arg_sorts.len(),
                entries: model
                    .predicate_entries(table)
                    .filter_map(|(args, value)| value.map(|value| PredicateEntryJson { args, value }))
                    .collect(),
            })
            .collect();
        ModelJson {
            sizes: model.sizes().to_vec(),
            functions,
            predicates,
        }
    }
}

/// JSON representation of a builder run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum FmbResultJson {
    Satisfiable {
        model: ModelJson,
        statistics: FmbStatistics,
        time_seconds: f64,
    },
    Unsatisfiable {
        statistics: FmbStatistics,
        time_seconds: f64,
    },
    GaveUp {
        reason: GaveUpReason,
        message: String,
        statistics: FmbStatistics,
        time_seconds: f64,
    },
    Timeout {
        statistics: FmbStatistics,
        time_seconds: f64,
    },
    Inappropriate {
        time_seconds: f64,
    },
}

impl FmbResult {
    pub fn to_json(&self, statistics: &FmbStatistics, time_seconds: f64, interner: &Interner) -> FmbResultJson {
        let statistics = statistics.clone();
        match self {
            FmbResult::Satisfiable(model) => FmbResultJson::Satisfiable {
                model: ModelJson::from_model(model, interner),
                statistics,
                time_seconds,
            },
            FmbResult::Refutation => FmbResultJson::Unsatisfiable {
                statistics,
                time_seconds,
            },
            FmbResult::GaveUp(reason) => FmbResultJson::GaveUp {
                reason: *reason,
                message: reason.to_string(),
                statistics,
                time_seconds,
            },
            FmbResult::TimeLimit => FmbResultJson::Timeout {
                statistics,
                time_seconds,
            },
            FmbResult::Inappropriate => FmbResultJson::Inappropriate { time_seconds },
        }
    }
}
