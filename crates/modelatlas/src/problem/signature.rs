//! Sorted signature consumed by the model builder
//!
//! Sorts are dense indices. Several sorts may share one domain: each sort
//! has a parent *distinct sort*, and only distinct sorts have sizes. A sort
//! may also carry an upper bound smaller than its distinct sort's size,
//! meaning elements beyond the bound never need to be distinguished there.

use crate::logic::{FunctionId, PredicateId};
use serde::{Deserialize, Serialize};

/// Bound value for sorts without an upper bound
pub const UNBOUNDED: u32 = u32::MAX;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedSignature {
    /// Number of sorts
    pub sorts: usize,
    /// Number of distinct sorts
    pub distinct_sorts: usize,
    /// sort -> distinct sort
    pub parents: Vec<usize>,
    /// sort -> upper bound on the elements the sort needs
    pub sort_bounds: Vec<u32>,
    /// distinct sort -> monotonic (a model at size n extends to n + 1)
    pub monotonic_sorts: Vec<bool>,
    /// function -> argument sorts followed by the return sort
    pub function_signatures: Vec<Vec<usize>>,
    /// predicate -> argument sorts; the equality entry is unused
    pub predicate_signatures: Vec<Vec<usize>>,
    /// sort -> constants of that sort
    pub sorted_constants: Vec<Vec<FunctionId>>,
    /// sort -> non-constant functions returning that sort
    pub sorted_functions: Vec<Vec<FunctionId>>,
    /// distinct sort -> sort assigned to variables only compared by equality
    pub var_eq_sorts: Vec<usize>,
}

impl SortedSignature {
    /// Signature with a single unbounded, non-monotonic sort
    pub fn single_sort(function_arities: &[usize], predicate_arities: &[usize]) -> Self {
        let mut sorted_constants = vec![Vec::new()];
        let mut sorted_functions = vec![Vec::new()];
        for (f, &arity) in function_arities.iter().enumerate() {
            if arity == 0 {
                sorted_constants[0].push(FunctionId::from_index(f));
            } else {
                sorted_functions[0].push(FunctionId::from_index(f));
            }
        }
        let predicate_signatures = predicate_arities
            .iter()
            .enumerate()
            .map(|(p, &arity)| {
                if PredicateId::from_index(p).is_equality() {
                    Vec::new()
                } else {
                    vec![0; arity]
                }
            })
            .collect();

        SortedSignature {
            sorts: 1,
            distinct_sorts: 1,
            parents: vec![0],
            sort_bounds: vec![UNBOUNDED],
            monotonic_sorts: vec![false],
            function_signatures: function_arities.iter().map(|&a| vec![0; a + 1]).collect(),
            predicate_signatures,
            sorted_constants,
            sorted_functions,
            var_eq_sorts: vec![0],
        }
    }

    pub fn function_arity(&self, f: FunctionId) -> usize {
        self.function_signatures[f.index()].len().saturating_sub(1)
    }

    pub fn predicate_arity(&self, p: PredicateId) -> usize {
        self.predicate_signatures[p.index()].len()
    }

    pub fn return_sort(&self, f: FunctionId) -> usize {
        let sig = &self.function_signatures[f.index()];
        sig[sig.len() - 1]
    }

    pub fn arg_sorts(&self, f: FunctionId) -> &[usize] {
        let sig = &self.function_signatures[f.index()];
        &sig[..sig.len() - 1]
    }

    pub fn function_count(&self) -> usize {
        self.function_signatures.len()
    }

    pub fn predicate_count(&self) -> usize {
        self.predicate_signatures.len()
    }

    /// Distinct sort of a sort
    pub fn parent(&self, sort: usize) -> usize {
        self.parents[sort]
    }

    pub fn bound(&self, sort: usize) -> u32 {
        self.sort_bounds[sort]
    }

    /// Effective grounding bound of a sort under the given distinct sizes
    pub fn bounded_size(&self, sort: usize, distinct_sizes: &[u32]) -> u32 {
        distinct_sizes[self.parents[sort]].min(self.sort_bounds[sort])
    }

    /// Size of every sort under the given distinct sizes
    pub fn sort_sizes(&self, distinct_sizes: &[u32]) -> Vec<u32> {
        self.parents.iter().map(|&d| distinct_sizes[d]).collect()
    }
}
