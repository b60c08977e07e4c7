//! Enumeration of domain-size vectors
//!
//! After an unsatisfiable round the builder turns the failed growth markers
//! into a [`Nogood`] describing a region of size vectors that cannot hold a
//! model, and asks a [`DomainSizeSearch`] for the next vector to try.

mod constraint_solver;
mod contour;
mod nogood_queue;
mod order_encoding;

pub use constraint_solver::ConstraintSolverSearch;
pub use contour::ContourGrowth;
pub use nogood_queue::NogoodQueueSearch;
pub use order_encoding::{OrderEncoding, OrderLiteral};

use crate::error::OracleError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintSign {
    /// Any size
    Star,
    Eq,
    Leq,
    Geq,
}

/// Per distinct sort a sign and a size; rules out every size vector that
/// satisfies all of its non-star entries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nogood {
    pub entries: Vec<(ConstraintSign, u32)>,
}

impl Nogood {
    /// All entries `Star`, carrying `sizes` as their values
    pub fn star(sizes: &[u32]) -> Self {
        Nogood {
            entries: sizes.iter().map(|&s| (ConstraintSign::Star, s)).collect(),
        }
    }

    pub fn exact(sizes: &[u32]) -> Self {
        Nogood {
            entries: sizes.iter().map(|&s| (ConstraintSign::Eq, s)).collect(),
        }
    }

    pub fn set(&mut self, sort: usize, sign: ConstraintSign) {
        self.entries[sort].0 = sign;
    }

    pub fn sign(&self, sort: usize) -> ConstraintSign {
        self.entries[sort].0
    }

    /// Sizes carried by the entries, regardless of sign
    pub fn values(&self) -> Vec<u32> {
        self.entries.iter().map(|&(_, v)| v).collect()
    }

    /// Whether `sizes` lies in the region this nogood excludes
    pub fn rules_out(&self, sizes: &[u32]) -> bool {
        self.entries.iter().zip(sizes).all(|(&(sign, value), &size)| match sign {
            ConstraintSign::Star => true,
            ConstraintSign::Eq => size == value,
            ConstraintSign::Leq => size <= value,
            ConstraintSign::Geq => size >= value,
        })
    }
}

impl fmt::Display for Nogood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, &(sign, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match sign {
                ConstraintSign::Star => write!(f, "*")?,
                ConstraintSign::Eq => write!(f, "={}", value)?,
                ConstraintSign::Leq => write!(f, "<={}", value)?,
                ConstraintSign::Geq => write!(f, ">={}", value)?,
            }
        }
        write!(f, "]")
    }
}

/// Ordering constraints between distinct sorts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeOrdering {
    /// `(a, b)`: `size(a) >= size(b)`
    pub non_strict: Vec<(usize, usize)>,
    /// `(a, b)`: `size(a) > size(b)`
    pub strict: Vec<(usize, usize)>,
}

impl SizeOrdering {
    pub fn new(non_strict: Vec<(usize, usize)>, strict: Vec<(usize, usize)>) -> Self {
        SizeOrdering { non_strict, strict }
    }

    pub fn is_empty(&self) -> bool {
        self.non_strict.is_empty() && self.strict.is_empty()
    }

    /// First constraint `sizes` violates
    pub fn violation(&self, sizes: &[u32]) -> Option<(usize, usize)> {
        let non_strict = self
            .non_strict
            .iter()
            .find(|&&(a, b)| sizes[a] < sizes[b]);
        let strict = || self.strict.iter().find(|&&(a, b)| sizes[a] <= sizes[b]);
        non_strict.or_else(strict).copied()
    }

    /// Raise sizes until every constraint holds.
    ///
    /// Returns `false` once a size would pass its maximum; `sizes` is then
    /// left partially raised.
    pub fn close(&self, sizes: &mut [u32], maxima: &[u32]) -> bool {
        loop {
            let mut updated = false;
            for &(a, b) in &self.non_strict {
                if sizes[a] < sizes[b] {
                    sizes[a] = sizes[b];
                    updated = true;
                }
            }
            for &(a, b) in &self.strict {
                if sizes[a] <= sizes[b] {
                    sizes[a] = sizes[b].saturating_add(1);
                    updated = true;
                }
            }
            if sizes.iter().zip(maxima).any(|(s, m)| s > m) {
                return false;
            }
            if !updated {
                return true;
            }
        }
    }
}

/// Strategy proposing the next size vector after an unsatisfiable round
pub trait DomainSizeSearch {
    /// Prepare for a run starting at `sizes`; `Ok(false)` if the ordering
    /// constraints alone leave no size vector
    fn init(&mut self, start_size: u32, sizes: &[u32], ordering: &SizeOrdering) -> Result<bool, OracleError>;

    /// Record a region without models and the cost of the round that found it
    fn learn_nogood(&mut self, nogood: Nogood, weight: u64);

    /// Next size vector to try, or `None` when the space is exhausted
    fn propose_next(&mut self, current: &[u32], maxima: &[u32]) -> Result<Option<Vec<u32>>, OracleError>;

    /// Whether exhaustion proves that no finite model exists
    fn is_complete(&self, distinct_sorts: usize) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_out() {
        let mut nogood = Nogood::star(&[2, 3]);
        assert!(nogood.rules_out(&[7, 1]));
        nogood.set(0, ConstraintSign::Eq);
        nogood.set(1, ConstraintSign::Geq);
        assert!(nogood.rules_out(&[2, 3]));
        assert!(nogood.rules_out(&[2, 9]));
        assert!(!nogood.rules_out(&[2, 2]));
        assert!(!nogood.rules_out(&[3, 3]));
        nogood.set(0, ConstraintSign::Leq);
        assert!(nogood.rules_out(&[1, 4]));
        assert_eq!(nogood.to_string(), "[<=2,>=3]");
    }

    #[test]
    fn test_ordering_closure() {
        let ordering = SizeOrdering::new(vec![(0, 1)], vec![(2, 0)]);
        let mut sizes = vec![1, 3, 1];
        assert_eq!(ordering.violation(&sizes), Some((0, 1)));
        assert!(ordering.close(&mut sizes, &[10, 10, 10]));
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(ordering.violation(&sizes), None);

        let mut capped = vec![1, 3, 1];
        assert!(!ordering.close(&mut capped, &[10, 10, 3]));
    }
}
