//! Order encoding of bounded integer variables
//!
//! An integer `x` over `[lb, ub]` is represented by propositional variables
//! `x <= d` for `lb <= d < ub`, chained by `x <= d -> x <= d + 1`. Bounds
//! outside the domain fold to the constant literals.

use crate::sat::SatLiteral;
use std::ops::Not;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderLiteral {
    True,
    False,
    Lit(SatLiteral),
}

impl Not for OrderLiteral {
    type Output = OrderLiteral;

    fn not(self) -> OrderLiteral {
        match self {
            OrderLiteral::True => OrderLiteral::False,
            OrderLiteral::False => OrderLiteral::True,
            OrderLiteral::Lit(lit) => OrderLiteral::Lit(!lit),
        }
    }
}

/// Turn a disjunction into a clause: `None` if it already holds
pub fn to_clause(literals: &[OrderLiteral]) -> Option<Vec<SatLiteral>> {
    let mut clause = Vec::with_capacity(literals.len());
    for &literal in literals {
        match literal {
            OrderLiteral::True => return None,
            OrderLiteral::False => {}
            OrderLiteral::Lit(lit) => clause.push(lit),
        }
    }
    Some(clause)
}

#[derive(Debug, Clone, Copy)]
struct IntVar {
    lb: u32,
    ub: u32,
    /// SAT variable of `x <= lb`
    code: u32,
}

#[derive(Debug, Clone)]
pub struct OrderEncoding {
    vars: Vec<IntVar>,
    last_var: u32,
}

impl OrderEncoding {
    /// Lay out integer variables over `domains`, using SAT variables from
    /// `first_var` on. Each domain must satisfy `lb <= ub`.
    pub fn new(domains: &[(u32, u32)], first_var: u32) -> Self {
        let mut next = first_var;
        let vars = domains
            .iter()
            .map(|&(lb, ub)| {
                debug_assert!(lb <= ub);
                let var = IntVar { lb, ub, code: next };
                next += ub - lb;
                var
            })
            .collect();
        OrderEncoding {
            vars,
            last_var: next - 1,
        }
    }

    /// Highest SAT variable in use
    pub fn last_var(&self) -> u32 {
        self.last_var
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn bounds(&self, x: usize) -> (u32, u32) {
        (self.vars[x].lb, self.vars[x].ub)
    }

    /// `x <= d`
    pub fn le(&self, x: usize, d: i64) -> OrderLiteral {
        let var = self.vars[x];
        if d < var.lb as i64 {
            OrderLiteral::False
        } else if d >= var.ub as i64 {
            OrderLiteral::True
        } else {
            OrderLiteral::Lit(SatLiteral::positive(var.code + (d - var.lb as i64) as u32))
        }
    }

    /// `x >= d`
    pub fn ge(&self, x: usize, d: i64) -> OrderLiteral {
        !self.le(x, d - 1)
    }

    /// Chain clauses `x <= d -> x <= d + 1`
    pub fn axioms(&self) -> Vec<Vec<SatLiteral>> {
        let mut clauses = Vec::new();
        for (x, var) in self.vars.iter().enumerate() {
            for d in var.lb as i64..var.ub as i64 - 1 {
                if let Some(clause) = to_clause(&[!self.le(x, d), self.le(x, d + 1)]) {
                    clauses.push(clause);
                }
            }
        }
        clauses
    }

    /// Clauses for `sum(xs) <= c`, each extended with `prefix`
    pub fn encode_sum_le(&self, xs: &[usize], c: i64, prefix: &[SatLiteral]) -> Vec<Vec<SatLiteral>> {
        let mut clauses = Vec::new();
        let mut clause0 = prefix.to_vec();
        self.encode_sum_le_rec(xs, c, &mut clause0, &mut clauses);
        clauses
    }

    fn encode_sum_le_rec(&self, xs: &[usize], c: i64, clause0: &mut Vec<SatLiteral>, out: &mut Vec<Vec<SatLiteral>>) {
        let Some((&x, rest)) = xs.split_first() else {
            if c < 0 {
                out.push(clause0.clone());
            }
            return;
        };
        let (lb, ub) = self.bounds(x);
        let lb_rest: i64 = rest.iter().map(|&y| self.vars[y].lb as i64).sum();
        // largest value of x leaving room for the rest
        let ub0 = c - lb_rest;

        if !rest.is_empty() {
            let mut b = lb as i64;
            while b <= (ub as i64).min(ub0) {
                // x >= b -> sum(rest) <= c - b
                match self.le(x, b - 1) {
                    OrderLiteral::True => {}
                    OrderLiteral::False => self.encode_sum_le_rec(rest, c - b, clause0, out),
                    OrderLiteral::Lit(lit) => {
                        clause0.push(lit);
                        self.encode_sum_le_rec(rest, c - b, clause0, out);
                        clause0.pop();
                    }
                }
                b += 1;
            }
        }
        match self.le(x, ub0) {
            OrderLiteral::True => {}
            OrderLiteral::False => out.push(clause0.clone()),
            OrderLiteral::Lit(lit) => {
                let mut clause = clause0.clone();
                clause.push(lit);
                out.push(clause);
            }
        }
    }

    /// Value of `x` under an assignment given as a truth function
    pub fn value(&self, x: usize, holds: impl Fn(SatLiteral) -> bool) -> u32 {
        let var = self.vars[x];
        (var.lb..var.ub)
            .find(|&d| match self.le(x, d as i64) {
                OrderLiteral::Lit(lit) => holds(lit),
                OrderLiteral::True => true,
                OrderLiteral::False => false,
            })
            .unwrap_or(var.ub)
    }
}
