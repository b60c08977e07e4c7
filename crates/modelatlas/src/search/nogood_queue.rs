//! Nogood-priority enumeration
//!
//! Learned nogoods double as generators: the cheapest generator (fewest
//! clauses in the round that produced it) is materialized into a size
//! vector and each sort is tried one larger. A candidate is accepted unless
//! it passes a maximum, falls into a known nogood, or breaks an ordering
//! constraint. Candidates skipped for the last two reasons are re-queued as
//! artificial generators so the enumeration can move past them. A vector
//! already proposed is never proposed again, even after its own generator
//! has left the queue.

use super::{ConstraintSign, DomainSizeSearch, Nogood, SizeOrdering};
use crate::error::OracleError;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::trace;

#[derive(Debug, Clone)]
struct Generator {
    nogood: Nogood,
    weight: u64,
    /// Insertion order, breaks weight ties first-in first-out
    seq: u64,
}

impl PartialEq for Generator {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Generator {}

impl PartialOrd for Generator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Generator {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.weight, self.seq).cmp(&(other.weight, other.seq))
    }
}

#[derive(Debug, Default)]
pub struct NogoodQueueSearch {
    queue: BinaryHeap<Reverse<Generator>>,
    old: Vec<Nogood>,
    keep_old_generators: bool,
    proposed: HashSet<Vec<u32>>,
    max_weight: u64,
    seq: u64,
    ordering: SizeOrdering,
    skipped_sizes: bool,
}

impl NogoodQueueSearch {
    pub fn new(keep_old_generators: bool) -> Self {
        NogoodQueueSearch {
            keep_old_generators,
            ..Self::default()
        }
    }

    fn push(&mut self, nogood: Nogood, weight: u64) {
        self.seq += 1;
        self.queue.push(Reverse(Generator {
            nogood,
            weight,
            seq: self.seq,
        }));
    }

    /// Queue an artificial generator behind everything learned so far
    fn push_artificial(&mut self, nogood: Nogood) {
        self.max_weight += 1;
        self.push(nogood, self.max_weight);
    }

    /// Number of generators waiting
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl DomainSizeSearch for NogoodQueueSearch {
    fn init(&mut self, start_size: u32, sizes: &[u32], ordering: &SizeOrdering) -> Result<bool, OracleError> {
        self.skipped_sizes = start_size > 1;
        self.proposed.insert(sizes.to_vec());
        self.ordering = ordering.clone();
        Ok(true)
    }

    fn learn_nogood(&mut self, nogood: Nogood, weight: u64) {
        self.max_weight = self.max_weight.max(weight);
        self.push(nogood, weight);
    }

    fn propose_next(&mut self, _current: &[u32], maxima: &[u32]) -> Result<Option<Vec<u32>>, OracleError> {
        while let Some(Reverse(top)) = self.queue.peek() {
            let base = top.nogood.values();
            trace!(generator = %top.nogood, weight = top.weight, "picking generator");

            for i in 0..base.len() {
                let mut candidate = base.clone();
                candidate[i] += 1;

                if candidate[i] > maxima[i] || self.proposed.contains(&candidate) {
                    continue;
                }
                if self.queue.iter().any(|Reverse(g)| g.nogood.rules_out(&candidate)) {
                    continue;
                }
                if self.keep_old_generators && self.old.iter().any(|n| n.rules_out(&candidate)) {
                    self.push_artificial(Nogood::exact(&candidate));
                    continue;
                }
                if let Some((a, b)) = self.ordering.violation(&candidate) {
                    trace!(?candidate, a, b, "ordering constraint rules out candidate");
                    let mut nogood = Nogood::star(&candidate);
                    nogood.set(a, ConstraintSign::Eq);
                    nogood.set(b, ConstraintSign::Geq);
                    self.push_artificial(nogood);
                    continue;
                }
                self.proposed.insert(candidate.clone());
                return Ok(Some(candidate));
            }

            if let Some(Reverse(exhausted)) = self.queue.pop() {
                if self.keep_old_generators {
                    self.old.push(exhausted.nogood);
                }
            }
        }
        Ok(None)
    }

    fn is_complete(&self, distinct_sorts: usize) -> bool {
        distinct_sorts <= 1 && !self.skipped_sizes
    }
}
