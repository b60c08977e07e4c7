//! First-order logic representation
//!
//! Interned symbols, terms, literals, clauses and the sorted formulas used
//! for definitions of eliminated symbols.

pub mod core;
pub mod formula;
pub mod interner;

pub use self::core::clause::{CNFFormula, Clause, ClauseDisplay, ClauseRole};
pub use self::core::literal::{Literal, LiteralDisplay, PredicateSymbol};
pub use self::core::term::{FunctionSymbol, Term, TermDisplay, Variable};
pub use formula::{Formula, Quantifier};
pub use interner::{FunctionId, Interner, PredicateId, VariableId};
