//! Clauses and CNF formulas

use super::literal::Literal;
use crate::logic::interner::{Interner, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Role of an input clause (from TPTP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClauseRole {
    #[default]
    Axiom,
    Hypothesis,
    Definition,
    NegatedConjecture,
}

impl ClauseRole {
    pub fn from_tptp_role(role: &str) -> Self {
        match role {
            "hypothesis" => ClauseRole::Hypothesis,
            "definition" => ClauseRole::Definition,
            "negated_conjecture" | "conjecture" => ClauseRole::NegatedConjecture,
            _ => ClauseRole::Axiom,
        }
    }
}

/// A clause (disjunction of literals)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub literals: Vec<Literal>,
    /// Name given in the input, if any
    pub name: Option<String>,
    pub role: ClauseRole,
}

/// A CNF formula (conjunction of clauses)
#[derive(Debug, Clone, Default)]
pub struct CNFFormula {
    pub clauses: Vec<Clause>,
}

impl Clause {
    pub fn new(literals: Vec<Literal>) -> Self {
        Clause {
            literals,
            name: None,
            role: ClauseRole::default(),
        }
    }

    pub fn with_role(literals: Vec<Literal>, role: ClauseRole) -> Self {
        Clause {
            literals,
            name: None,
            role,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_ground(&self) -> bool {
        self.literals
            .iter()
            .all(|lit| lit.args.iter().all(|t| t.is_ground()))
    }

    /// Complementary literals or a positive reflexive equality
    pub fn is_tautology(&self) -> bool {
        for i in 0..self.literals.len() {
            for j in (i + 1)..self.literals.len() {
                if self.literals[i].predicate == self.literals[j].predicate
                    && self.literals[i].args == self.literals[j].args
                    && self.literals[i].polarity != self.literals[j].polarity
                {
                    return true;
                }
            }
        }

        self.literals
            .iter()
            .any(|lit| lit.polarity && lit.is_equality() && lit.args[0] == lit.args[1])
    }

    pub fn variable_ids(&self) -> HashSet<VariableId> {
        let mut vars = HashSet::new();
        for lit in &self.literals {
            for arg in &lit.args {
                arg.collect_variable_ids(&mut vars);
            }
        }
        vars
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> ClauseDisplay<'a> {
        ClauseDisplay {
            clause: self,
            interner,
        }
    }
}

/// Display wrapper for Clause that includes an interner for name resolution
pub struct ClauseDisplay<'a> {
    clause: &'a Clause,
    interner: &'a Interner,
}

impl<'a> fmt::Display for ClauseDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut literals = self.clause.literals.iter();
        let Some(first) = literals.next() else {
            return f.write_str("$false");
        };
        write!(f, "{}", first.display(self.interner))?;
        for lit in literals {
            write!(f, " | {}", lit.display(self.interner))?;
        }
        Ok(())
    }
}
