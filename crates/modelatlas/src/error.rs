//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// The propositional encoding of a round does not fit the oracle's
/// variable range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("variable id overflow while laying out {what}")]
    Overflow { what: String },
}

/// Failure reported by a SAT oracle backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("solver cannot allocate variable {requested}: limit is {limit}")]
    TooManyVariables { requested: u32, limit: u32 },
    #[error("literal refers to undeclared variable {0}")]
    UndeclaredVariable(u32),
    #[error("solver gave no answer")]
    Inconclusive,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("syntax error: {message}\nstatement: {statement}")]
    Syntax { statement: String, message: String },
    #[error("unsupported statement: {0}")]
    Unsupported(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("include file '{0}' not found")]
    IncludeNotFound(String),
    #[error("parsing timed out")]
    Timeout,
}

/// A clause set that cannot be turned into an FMB problem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProblemError {
    #[error("function {0} has no sorted signature")]
    MissingFunctionSignature(String),
    #[error("predicate {0} has no sorted signature")]
    MissingPredicateSignature(String),
    #[error("symbol {name} is used with arities {first} and {second}")]
    ArityMismatch {
        name: String,
        first: usize,
        second: usize,
    },
    #[error("variable {variable} of clause {clause} has no sort")]
    UnsortedVariable { clause: usize, variable: u32 },
    #[error("eliminated symbol {0} still occurs in a clause")]
    EliminatedSymbolInClause(String),
}

/// Failure while evaluating a definition against a partial model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("function {function} has no value at {args:?}")]
    UndefinedFunction { function: String, args: Vec<u32> },
    #[error("predicate {predicate} has no value at {args:?}")]
    UndefinedPredicate { predicate: String, args: Vec<u32> },
    #[error("variable {0} is unbound")]
    UnboundVariable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start size must be at least 1")]
    ZeroStartSize,
    #[error("symmetry ratio must be a finite non-negative number, got {0}")]
    InvalidSymmetryRatio(f32),
    #[error("time limit must be a finite non-negative number of seconds, got {0}")]
    InvalidTimeLimit(f64),
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for running the builder end to end
#[derive(Debug, Error)]
pub enum FmbError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("SAT oracle failure: {0}")]
    Oracle(#[from] OracleError),
}
