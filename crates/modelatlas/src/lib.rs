//! ModelAtlas: a finite model builder for sorted first-order clause sets
//!
//! The builder looks for a model with a fixed number of elements per
//! distinct sort by grounding the flattened clauses over those elements and
//! handing the result to a SAT solver. When a round fails, the failed
//! growth markers decide which sorts grow next.

pub mod config;
pub mod error;
pub mod fmb;
pub mod json;
pub mod logic;
pub mod model;
pub mod parser;
pub mod problem;
pub mod sat;
pub mod search;

// Re-export the builder and its configuration
pub use config::{EnumerationStrategy, FmbConfig, SymbolOrder, WidgetOrder};
pub use fmb::{FiniteModelBuilder, FmbResult, FmbStatistics, GaveUpReason};

// Re-export error types
pub use error::{ConfigError, EncodingError, EvalError, FmbError, OracleError, ParseError, ProblemError};

// Re-export logic and problem types
pub use logic::{CNFFormula, Clause, Formula, FunctionId, Interner, Literal, PredicateId, Quantifier, Term};
pub use problem::{FmbProblem, SortedSignature};

pub use json::{FmbResultJson, ModelJson};
pub use model::{FiniteModel, Valuation};
pub use parser::{parse_tptp, parse_tptp_file, ParsedProblem};
pub use sat::{BatsatOracle, SatClause, SatLiteral, SatOracle, SatStatus};
