//! Propositional layer: literals, clauses and the SAT oracle protocol

mod batsat_backend;

pub use batsat_backend::BatsatOracle;

use crate::error::OracleError;
use indexmap::IndexSet;
use std::fmt;

/// Literal over a 1-based propositional variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatLiteral {
    var: u32,
    polarity: bool,
}

impl SatLiteral {
    pub fn new(var: u32, polarity: bool) -> Self {
        debug_assert!(var > 0, "SAT variables are 1-based");
        SatLiteral { var, polarity }
    }

    pub fn positive(var: u32) -> Self {
        SatLiteral::new(var, true)
    }

    pub fn negative(var: u32) -> Self {
        SatLiteral::new(var, false)
    }

    pub fn var(self) -> u32 {
        self.var
    }

    pub fn polarity(self) -> bool {
        self.polarity
    }
}

impl std::ops::Not for SatLiteral {
    type Output = SatLiteral;

    fn not(self) -> SatLiteral {
        SatLiteral::new(self.var, !self.polarity)
    }
}

impl fmt::Display for SatLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.polarity {
            write!(f, "{}", self.var)
        } else {
            write!(f, "-{}", self.var)
        }
    }
}

/// Clause with sorted, duplicate-free literals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SatClause(Vec<SatLiteral>);

impl SatClause {
    /// Normalize the literals; `None` if the clause is a tautology
    pub fn from_literals(mut literals: Vec<SatLiteral>) -> Option<Self> {
        literals.sort_unstable();
        literals.dedup();
        if literals.windows(2).any(|w| w[0].var == w[1].var) {
            return None;
        }
        Some(SatClause(literals))
    }

    pub fn literals(&self) -> &[SatLiteral] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SatClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, lit) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", lit)?;
        }
        write!(f, " 0")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatStatus {
    Satisfiable,
    Unsatisfiable,
    Unknown,
}

/// Narrow interface to an incremental SAT solver.
///
/// Variables must be declared with [`SatOracle::ensure_var_count`] before
/// clauses mention them. After `Unsatisfiable`, `failed_assumptions`
/// returns the assumptions involved in the conflict; after
/// `Satisfiable`, `true_in_assignment` reads the model.
pub trait SatOracle {
    /// Largest variable id the backend can represent
    fn var_max(&self) -> u32;

    fn ensure_var_count(&mut self, count: u32) -> Result<(), OracleError>;

    fn add_clause(&mut self, clause: &SatClause) -> Result<(), OracleError>;

    fn add_clauses(&mut self, clauses: &[SatClause]) -> Result<(), OracleError> {
        for clause in clauses {
            self.add_clause(clause)?;
        }
        Ok(())
    }

    fn solve_under_assumptions(&mut self, assumptions: &[SatLiteral]) -> SatStatus;

    fn failed_assumptions(&self) -> Vec<SatLiteral>;

    fn true_in_assignment(&self, literal: SatLiteral) -> bool;
}

/// Per-round clause collection; adding the same clause twice is a no-op
#[derive(Debug, Default)]
pub struct ClauseBuffer {
    clauses: IndexSet<SatClause>,
    tautologies: usize,
}

impl ClauseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, literals: Vec<SatLiteral>) {
        match SatClause::from_literals(literals) {
            Some(clause) => {
                self.clauses.insert(clause);
            }
            None => self.tautologies += 1,
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Tautologies seen and discarded
    pub fn tautologies(&self) -> usize {
        self.tautologies
    }

    pub fn iter(&self) -> impl Iterator<Item = &SatClause> {
        self.clauses.iter()
    }

    /// Hand every clause to the oracle, emptying the buffer
    pub fn submit(&mut self, oracle: &mut dyn SatOracle) -> Result<usize, OracleError> {
        let count = self.clauses.len();
        for clause in self.clauses.drain(..) {
            oracle.add_clause(&clause)?;
        }
        Ok(count)
    }
}
