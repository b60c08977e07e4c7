//! Size enumeration as an integer constraint problem
//!
//! Every learned nogood becomes a clause over per-sort size variables; the
//! next size vector is a solution of smallest total size. Each proposal
//! builds a fresh SAT instance over an order encoding of the sizes.
//!
//! Domains are capped at `M + n + 1`, `M` being the largest size any
//! constraint mentions and `n` the number of sorts: above `M` only the
//! relative order of sizes matters, so every solution compresses into
//! that window.

use super::order_encoding::{to_clause, OrderEncoding};
use super::{ConstraintSign, DomainSizeSearch, Nogood, SizeOrdering};
use crate::error::OracleError;
use crate::sat::{BatsatOracle, SatClause, SatLiteral, SatOracle, SatStatus};
use std::marker::PhantomData;
use tracing::{debug, trace};

pub struct ConstraintSolverSearch<O: SatOracle + Default = BatsatOracle> {
    lower: Vec<u32>,
    ordering: SizeOrdering,
    nogoods: Vec<Nogood>,
    /// Smallest total size not yet shown infeasible
    last_weight: u64,
    skipped_sizes: bool,
    _oracle: PhantomData<fn() -> O>,
}

impl<O: SatOracle + Default> Default for ConstraintSolverSearch<O> {
    fn default() -> Self {
        ConstraintSolverSearch {
            lower: Vec::new(),
            ordering: SizeOrdering::default(),
            nogoods: Vec::new(),
            last_weight: 0,
            skipped_sizes: false,
            _oracle: PhantomData,
        }
    }
}

impl<O: SatOracle + Default> ConstraintSolverSearch<O> {
    pub fn new() -> Self {
        Self::default()
    }

    fn horizon(&self) -> u32 {
        let mentioned = self
            .nogoods
            .iter()
            .flat_map(|n| n.entries.iter())
            .filter(|(sign, _)| *sign != ConstraintSign::Star)
            .map(|&(_, v)| v)
            .chain(self.lower.iter().copied())
            .max()
            .unwrap_or(1);
        mentioned
            .saturating_add(self.lower.len() as u32)
            .saturating_add(1)
    }

    /// SAT instance holding every constraint learned so far
    fn build(&self, maxima: &[u32]) -> Result<Option<(O, OrderEncoding)>, OracleError> {
        let horizon = self.horizon();
        let mut domains = Vec::with_capacity(self.lower.len());
        for (&lb, &max) in self.lower.iter().zip(maxima) {
            if lb > max {
                return Ok(None);
            }
            domains.push((lb, max.min(horizon).max(lb)));
        }
        let enc = OrderEncoding::new(&domains, 1);

        let mut clauses = enc.axioms();
        for &(a, b) in &self.ordering.non_strict {
            let (lb, ub) = enc.bounds(b);
            for d in lb as i64..=ub as i64 {
                clauses.extend(to_clause(&[!enc.ge(b, d), enc.ge(a, d)]));
            }
        }
        for &(a, b) in &self.ordering.strict {
            let (lb, ub) = enc.bounds(b);
            for d in lb as i64..=ub as i64 {
                clauses.extend(to_clause(&[!enc.ge(b, d), enc.ge(a, d + 1)]));
            }
        }
        for nogood in &self.nogoods {
            clauses.extend(nogood_clause(&enc, nogood));
        }

        let mut oracle = O::default();
        oracle.ensure_var_count(enc.last_var())?;
        for clause in clauses {
            if let Some(clause) = SatClause::from_literals(clause) {
                oracle.add_clause(&clause)?;
            }
        }
        Ok(Some((oracle, enc)))
    }
}

/// Clause excluding the region of `nogood`; `None` if it excludes nothing
/// inside the domains
fn nogood_clause(enc: &OrderEncoding, nogood: &Nogood) -> Option<Vec<SatLiteral>> {
    let mut literals = Vec::new();
    for (x, &(sign, c)) in nogood.entries.iter().enumerate() {
        let c = c as i64;
        match sign {
            ConstraintSign::Star => {}
            ConstraintSign::Eq => {
                literals.push(enc.le(x, c - 1));
                literals.push(enc.ge(x, c + 1));
            }
            ConstraintSign::Leq => literals.push(enc.ge(x, c + 1)),
            ConstraintSign::Geq => literals.push(enc.le(x, c - 1)),
        }
    }
    to_clause(&literals)
}

fn check(oracle: &mut impl SatOracle, assumptions: &[SatLiteral]) -> Result<bool, OracleError> {
    match oracle.solve_under_assumptions(assumptions) {
        SatStatus::Satisfiable => Ok(true),
        SatStatus::Unsatisfiable => Ok(false),
        SatStatus::Unknown => Err(OracleError::Inconclusive),
    }
}

impl<O: SatOracle + Default> DomainSizeSearch for ConstraintSolverSearch<O> {
    fn init(&mut self, start_size: u32, sizes: &[u32], ordering: &SizeOrdering) -> Result<bool, OracleError> {
        self.skipped_sizes = start_size > 1;
        self.lower = sizes.to_vec();
        self.ordering = ordering.clone();
        self.nogoods.clear();
        self.last_weight = sizes.iter().map(|&s| s as u64).sum();
        if ordering.strict.is_empty() {
            return Ok(true);
        }
        let unbounded = vec![u32::MAX; sizes.len()];
        match self.build(&unbounded)? {
            Some((mut oracle, _)) => check(&mut oracle, &[]),
            None => Ok(false),
        }
    }

    fn learn_nogood(&mut self, nogood: Nogood, _weight: u64) {
        trace!(%nogood, "learned");
        self.nogoods.push(nogood);
    }

    fn propose_next(&mut self, _current: &[u32], maxima: &[u32]) -> Result<Option<Vec<u32>>, OracleError> {
        let Some((mut oracle, enc)) = self.build(maxima)? else {
            return Ok(None);
        };
        if !check(&mut oracle, &[])? {
            return Ok(None);
        }

        let xs: Vec<usize> = (0..enc.len()).collect();
        let mut next_var = enc.last_var();
        loop {
            // guard each bound so failed targets stay retractable
            next_var += 1;
            oracle.ensure_var_count(next_var)?;
            let guard = SatLiteral::positive(next_var);
            for clause in enc.encode_sum_le(&xs, self.last_weight as i64, &[!guard]) {
                if let Some(clause) = SatClause::from_literals(clause) {
                    oracle.add_clause(&clause)?;
                }
            }
            if check(&mut oracle, &[guard])? {
                let sizes: Vec<u32> = xs
                    .iter()
                    .map(|&x| enc.value(x, |l| oracle.true_in_assignment(l)))
                    .collect();
                debug!(weight = self.last_weight, ?sizes, "minimal size vector");
                return Ok(Some(sizes));
            }
            self.last_weight += 1;
        }
    }

    fn is_complete(&self, _distinct_sorts: usize) -> bool {
        !self.skipped_sizes
    }
}
