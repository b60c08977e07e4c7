//! Sorted first-order formulas
//!
//! Used for the bodies of symbols eliminated during preprocessing. Every
//! quantified variable carries the distinct sort it ranges over so that a
//! finite model can evaluate the formula by enumeration.

use super::core::{Literal, Variable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formula {
    True,
    False,
    /// Atomic formula; the literal's polarity is respected
    Atom(Literal),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    /// Quantifier, bound variable, distinct sort of the variable, body
    Quantified(Quantifier, Variable, usize, Box<Formula>),
}

impl Formula {
    pub fn free_variables(&self) -> HashSet<Variable> {
        match self {
            Formula::True | Formula::False => HashSet::new(),
            Formula::Atom(lit) => {
                let mut ids = HashSet::new();
                for arg in &lit.args {
                    arg.collect_variable_ids(&mut ids);
                }
                ids.into_iter().map(Variable::new).collect()
            }
            Formula::Not(f) => f.free_variables(),
            Formula::And(fs) | Formula::Or(fs) => {
                fs.iter().flat_map(|f| f.free_variables()).collect()
            }
            Formula::Implies(l, r) | Formula::Iff(l, r) => {
                let mut vars = l.free_variables();
                vars.extend(r.free_variables());
                vars
            }
            Formula::Quantified(_, var, _, body) => {
                let mut vars = body.free_variables();
                vars.remove(var);
                vars
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.free_variables().is_empty()
    }
}
