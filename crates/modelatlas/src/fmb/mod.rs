//! Finite model building by repeated SAT encoding
//!
//! The submodules are the stages of one round, leaf first: the mixed-radix
//! [`odometer`], the variable [`encoder`], widget ranking for
//! [`symmetry`] breaking, the clause [`grounder`], the [`axioms`] and model
//! extraction ([`extract`]). [`FiniteModelBuilder`] drives the rounds.

pub mod axioms;
mod builder;
pub mod encoder;
pub mod extract;
pub mod grounder;
pub mod odometer;
pub mod symmetry;

#[cfg(test)]
mod proptest_tests;

pub use builder::{FiniteModelBuilder, FmbResult, FmbStatistics, GaveUpReason};
pub use encoder::{Decoded, Symbol, VariableEncoder};
pub use odometer::Odometer;
pub use symmetry::GroundedTerm;
