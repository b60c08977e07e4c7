//! Problem handed to the finite model builder
//!
//! Clauses arrive flattened: every literal is either `p(X1..Xn)`,
//! `f(X1..Xn) = Y` (of either polarity) or `X = Y`, with variables
//! numbered densely from 0 inside each clause. Symbols removed during
//! preprocessing travel with their definitions so that a model can be
//! completed after the search.

mod clique;
mod flatten;
pub mod signature;

pub use clique::max_clique_size;
pub use signature::{SortedSignature, UNBOUNDED};

use crate::logic::{Formula, FunctionId, Interner, PredicateId, Term, Variable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A literal of a flattened clause; arguments are clause variable indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlatLiteral {
    /// `p(X1..Xn)`, never equality
    Predicate {
        predicate: PredicateId,
        args: Vec<u32>,
        polarity: bool,
    },
    /// `f(X1..Xn) = Y`
    Function {
        function: FunctionId,
        args: Vec<u32>,
        result: u32,
        polarity: bool,
    },
    /// `X = Y` between two variables of the given distinct sort
    VarEquality {
        left: u32,
        right: u32,
        polarity: bool,
        distinct_sort: usize,
    },
}

impl FlatLiteral {
    pub fn polarity(&self) -> bool {
        match self {
            FlatLiteral::Predicate { polarity, .. }
            | FlatLiteral::Function { polarity, .. }
            | FlatLiteral::VarEquality { polarity, .. } => *polarity,
        }
    }
}

/// A flattened clause with `variables` distinct variables `0..variables`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatClause {
    pub literals: Vec<FlatLiteral>,
    pub variables: u32,
}

impl FlatClause {
    pub fn is_ground(&self) -> bool {
        self.variables == 0
    }
}

/// `f(args) = body`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Argument variables with their distinct sorts
    pub args: Vec<(Variable, usize)>,
    pub result_sort: usize,
    pub body: Term,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateDefinition {
    /// The predicate is true (or false) everywhere
    Constant(bool),
    /// `p(args) <=> body`, or `p(args) <=> ~body` when `polarity` is false
    Equivalence {
        args: Vec<(Variable, usize)>,
        body: Formula,
        polarity: bool,
    },
}

/// Input to [`crate::fmb::FiniteModelBuilder`]
#[derive(Debug, Clone, Default)]
pub struct FmbProblem {
    pub interner: Interner,
    pub signature: SortedSignature,
    /// Clauses with at least one variable
    pub clauses: Vec<FlatClause>,
    /// Propositional clauses
    pub ground_clauses: Vec<FlatClause>,
    /// function -> occurrence count after preprocessing
    pub function_usage: Vec<u32>,
    pub deleted_functions: IndexMap<FunctionId, FunctionDefinition>,
    pub deleted_predicates: IndexMap<PredicateId, PredicateDefinition>,
    /// Predicates that keep their SAT encoding but were also given a definition
    pub partially_deleted_predicates: IndexMap<PredicateId, PredicateDefinition>,
    /// Predicates decided true or false by preprocessing
    pub trivial_predicates: IndexMap<PredicateId, bool>,
    /// `(a, b)`: distinct sort `a` is at least as large as `b`
    pub sort_constraints: Vec<(usize, usize)>,
    /// `(a, b)`: distinct sort `a` is strictly larger than `b`
    pub strict_sort_constraints: Vec<(usize, usize)>,
    /// distinct sort -> smallest admissible size
    pub distinct_sort_mins: Vec<u32>,
    /// Preprocessing proved some domain must be infinite
    pub known_infinite_domain: bool,
    /// Preprocessing derived the empty clause
    pub contains_empty_clause: bool,
}

impl FmbProblem {
    pub fn clause_count(&self) -> usize {
        self.clauses.len() + self.ground_clauses.len()
    }

    pub fn is_function_deleted(&self, f: FunctionId) -> bool {
        self.deleted_functions.contains_key(&f)
    }

    pub fn is_predicate_deleted(&self, p: PredicateId) -> bool {
        self.deleted_predicates.contains_key(&p)
    }
}
