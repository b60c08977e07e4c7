//! Core term, literal and clause types

pub mod clause;
pub mod literal;
pub mod term;

pub use clause::{CNFFormula, Clause, ClauseDisplay, ClauseRole};
pub use literal::{Literal, LiteralDisplay, PredicateSymbol};
pub use term::{FunctionSymbol, Term, TermDisplay, Variable};
