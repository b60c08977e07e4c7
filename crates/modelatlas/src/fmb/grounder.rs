//! Instantiation of flat clauses over the current domain sizes

use super::encoder::VariableEncoder;
use super::odometer::Odometer;
use crate::error::ProblemError;
use crate::logic::PredicateId;
use crate::problem::{FlatClause, FlatLiteral, SortedSignature};
use crate::sat::{ClauseBuffer, SatLiteral};
use indexmap::IndexMap;

/// Sort of each variable of a clause.
///
/// Sorts come from the signatures of the symbols a variable is an argument
/// (or result) of, then flow across `X = Y` literals. A variable only ever
/// compared by equality gets the equality sort of its distinct sort.
pub fn clause_variable_sorts(
    signature: &SortedSignature,
    clause: &FlatClause,
    clause_index: usize,
) -> Result<Vec<usize>, ProblemError> {
    let mut sorts: Vec<Option<usize>> = vec![None; clause.variables as usize];

    for lit in &clause.literals {
        match lit {
            FlatLiteral::Predicate {
                predicate, args, ..
            } => {
                let sig = &signature.predicate_signatures[predicate.index()];
                for (&x, &s) in args.iter().zip(sig) {
                    sorts[x as usize].get_or_insert(s);
                }
            }
            FlatLiteral::Function {
                function,
                args,
                result,
                ..
            } => {
                let sig = &signature.function_signatures[function.index()];
                for (&x, &s) in args.iter().chain(std::iter::once(result)).zip(sig) {
                    sorts[x as usize].get_or_insert(s);
                }
            }
            FlatLiteral::VarEquality { .. } => {}
        }
    }

    loop {
        let mut changed = false;
        for lit in &clause.literals {
            if let FlatLiteral::VarEquality { left, right, .. } = *lit {
                let (l, r) = (left as usize, right as usize);
                match (sorts[l], sorts[r]) {
                    (Some(s), None) => {
                        sorts[r] = Some(s);
                        changed = true;
                    }
                    (None, Some(s)) => {
                        sorts[l] = Some(s);
                        changed = true;
                    }
                    _ => {}
                }
            }
        }
        if !changed {
            break;
        }
    }

    for lit in &clause.literals {
        if let FlatLiteral::VarEquality {
            left,
            right,
            distinct_sort,
            ..
        } = *lit
        {
            let eq_sort = signature.var_eq_sorts[distinct_sort];
            sorts[left as usize].get_or_insert(eq_sort);
            sorts[right as usize].get_or_insert(eq_sort);
        }
    }

    sorts
        .into_iter()
        .enumerate()
        .map(|(variable, sort)| {
            sort.ok_or(ProblemError::UnsortedVariable {
                clause: clause_index,
                variable: variable as u32,
            })
        })
        .collect()
}

/// Everything the grounder reads in one round
pub struct Grounder<'a> {
    pub signature: &'a SortedSignature,
    pub encoder: &'a VariableEncoder,
    pub distinct_sizes: &'a [u32],
    pub trivial_predicates: &'a IndexMap<PredicateId, bool>,
    /// Tag instances with per-size markers instead of instance markers
    pub size_markers: bool,
}

enum Grounded {
    Literal(SatLiteral),
    /// The literal is false under this grounding
    Dropped,
    /// The literal is true under this grounding
    Satisfied,
}

impl<'a> Grounder<'a> {
    /// Propositional clauses: nullary predicates only
    pub fn ground_propositional(&self, clause: &FlatClause, out: &mut ClauseBuffer) {
        debug_assert!(clause.is_ground());
        let mut literals = Vec::with_capacity(clause.literals.len());
        for lit in &clause.literals {
            match self.ground_literal(lit, &[]) {
                Grounded::Literal(l) => literals.push(l),
                Grounded::Dropped => {}
                Grounded::Satisfied => return,
            }
        }
        out.add(literals);
    }

    /// All instances of a non-ground clause; returns the number of groundings visited
    pub fn ground_clause(&self, clause: &FlatClause, var_sorts: &[usize], out: &mut ClauseBuffer) -> u64 {
        let bounds: Vec<u32> = var_sorts
            .iter()
            .map(|&s| self.signature.bounded_size(s, self.distinct_sizes))
            .collect();

        // distinct sorts of non-monotonic variables
        let marked: Vec<Option<usize>> = var_sorts
            .iter()
            .map(|&s| {
                let d = self.signature.parent(s);
                (!self.signature.monotonic_sorts[d]).then_some(d)
            })
            .collect();

        let mut usage_markers = Vec::new();
        if !self.size_markers {
            let mut touched: Vec<usize> = marked.iter().flatten().copied().collect();
            touched.sort_unstable();
            touched.dedup();
            usage_markers = touched
                .into_iter()
                .map(|d| self.encoder.instances_marker(d, false))
                .collect();
        }

        let mut maxima = vec![0u32; self.distinct_sizes.len()];
        let mut odometer = Odometer::new(bounds);
        let mut visited = 0;
        'instances: while let Some(grounding) = odometer.next_tuple() {
            visited += 1;
            let mut literals = Vec::with_capacity(clause.literals.len() + usage_markers.len());

            if self.size_markers {
                maxima.iter_mut().for_each(|m| *m = 0);
                for (&g, d) in grounding.iter().zip(&marked) {
                    if let Some(d) = *d {
                        maxima[d] = maxima[d].max(g);
                    }
                }
                for (d, &val) in maxima.iter().enumerate() {
                    if val > 1 {
                        literals.push(self.encoder.size_marker(d, val - 2, false));
                    }
                }
            } else {
                literals.extend_from_slice(&usage_markers);
            }

            for lit in &clause.literals {
                match self.ground_literal(lit, grounding) {
                    Grounded::Literal(l) => literals.push(l),
                    Grounded::Dropped => {}
                    Grounded::Satisfied => continue 'instances,
                }
            }
            out.add(literals);
        }
        visited
    }

    fn ground_literal(&self, lit: &FlatLiteral, grounding: &[u32]) -> Grounded {
        match lit {
            FlatLiteral::VarEquality {
                left,
                right,
                polarity,
                ..
            } => {
                let equal = grounding[*left as usize] == grounding[*right as usize];
                if equal == *polarity {
                    Grounded::Satisfied
                } else {
                    Grounded::Dropped
                }
            }
            FlatLiteral::Function {
                function,
                args,
                result,
                polarity,
            } => {
                let args: Vec<u32> = args.iter().map(|&x| grounding[x as usize]).collect();
                Grounded::Literal(self.encoder.function_literal(
                    *function,
                    &args,
                    grounding[*result as usize],
                    *polarity,
                ))
            }
            FlatLiteral::Predicate {
                predicate,
                args,
                polarity,
            } => {
                if let Some(&value) = self.trivial_predicates.get(predicate) {
                    return if value == *polarity {
                        Grounded::Satisfied
                    } else {
                        Grounded::Dropped
                    };
                }
                let args: Vec<u32> = args.iter().map(|&x| grounding[x as usize]).collect();
                Grounded::Literal(self.encoder.predicate_literal(*predicate, &args, *polarity))
            }
        }
    }
}

/// Number of instances grounding would produce under `distinct_sizes`
pub fn estimate_instance_count(
    signature: &SortedSignature,
    clause_sorts: &[Vec<usize>],
    distinct_sizes: &[u32],
) -> u64 {
    clause_sorts
        .iter()
        .map(|sorts| {
            let bounds: Vec<u32> = sorts
                .iter()
                .map(|&s| signature.bounded_size(s, distinct_sizes))
                .collect();
            Odometer::count(&bounds)
        })
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::FunctionId;
    use crate::problem::FmbProblem;
    use crate::parser::parse_tptp;

    fn problem(tptp: &str) -> FmbProblem {
        let parsed = parse_tptp(tptp, &[], None).unwrap();
        FmbProblem::from_cnf(parsed.formula, parsed.interner).unwrap()
    }

    fn encoder(p: &FmbProblem, size: u32, size_markers: bool) -> VariableEncoder {
        let functions = vec![true; p.signature.function_count()];
        let predicates = vec![true; p.signature.predicate_count()];
        VariableEncoder::new(&p.signature, &functions, &predicates, &[size], size_markers, 1 << 20).unwrap()
    }

    #[test]
    fn test_variable_sorts_from_signatures() {
        let p = problem("cnf(c, axiom, p(X) | f(Y) = Z).");
        let sorts = clause_variable_sorts(&p.signature, &p.clauses[0], 0).unwrap();
        assert_eq!(sorts, vec![0, 0, 0]);
    }

    #[test]
    fn test_equality_only_clause_uses_equality_sort() {
        let mut p = problem("cnf(c, axiom, X = Y | X = Z).");
        p.signature.sorts = 2;
        p.signature.parents.push(0);
        p.signature.sort_bounds.push(crate::problem::UNBOUNDED);
        p.signature.var_eq_sorts = vec![1];
        let sorts = clause_variable_sorts(&p.signature, &p.clauses[0], 0).unwrap();
        assert_eq!(sorts, vec![1, 1, 1]);
    }

    #[test]
    fn test_instances_with_usage_markers() {
        let p = problem("cnf(c, axiom, p(X, Y) | p(Y, X)).");
        let enc = encoder(&p, 2, false);
        let trivial = IndexMap::new();
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[2],
            trivial_predicates: &trivial,
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        let visited = grounder.ground_clause(&p.clauses[0], &[0, 0], &mut out);
        assert_eq!(visited, 4);
        // (1,2) and (2,1) give the same clause; (1,1) and (2,2) collapse to units
        assert_eq!(out.len(), 3);
        let marker = enc.instances_marker(0, false);
        assert!(out.iter().all(|c| c.literals().contains(&marker)));
    }

    #[test]
    fn test_var_equalities_decided_per_instance() {
        let p = problem("cnf(c, axiom, X = Y | p(X) | p(Y)).");
        let enc = encoder(&p, 3, false);
        let trivial = IndexMap::new();
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[3],
            trivial_predicates: &trivial,
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        grounder.ground_clause(&p.clauses[0], &[0, 0], &mut out);
        // diagonal instances are satisfied; off-diagonal pairs unordered
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.len() == 3));
    }

    #[test]
    fn test_size_markers_use_largest_value() {
        let p = problem("cnf(c, axiom, p(X)).");
        let enc = encoder(&p, 3, true);
        let trivial = IndexMap::new();
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[3],
            trivial_predicates: &trivial,
            size_markers: true,
        };
        let mut out = ClauseBuffer::new();
        grounder.ground_clause(&p.clauses[0], &[0], &mut out);
        let lens: Vec<usize> = out.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![1, 2, 2]);
        let last = out.iter().last().unwrap();
        assert!(last.literals().contains(&enc.size_marker(0, 1, false)));
    }

    #[test]
    fn test_monotonic_sorts_are_not_marked() {
        let mut p = problem("cnf(c, axiom, p(X)).");
        p.signature.monotonic_sorts = vec![true];
        let enc = encoder(&p, 2, false);
        let trivial = IndexMap::new();
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[2],
            trivial_predicates: &trivial,
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        grounder.ground_clause(&p.clauses[0], &[0], &mut out);
        assert!(out.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_trivial_predicates_are_decided() {
        let p = problem("cnf(c, axiom, p | q). cnf(d, axiom, ~p | r).");
        let enc = encoder(&p, 1, false);
        let pred = p.interner.get_predicate("p").unwrap();
        let mut trivial = IndexMap::new();
        trivial.insert(pred, true);
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[1],
            trivial_predicates: &trivial,
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        for clause in &p.ground_clauses {
            grounder.ground_propositional(clause, &mut out);
        }
        // first clause satisfied, second reduced to `r`
        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().len(), 1);
    }

    #[test]
    fn test_function_literals_carry_result() {
        let p = problem("cnf(c, axiom, f(X) = X).");
        let enc = encoder(&p, 2, false);
        let trivial = IndexMap::new();
        let grounder = Grounder {
            signature: &p.signature,
            encoder: &enc,
            distinct_sizes: &[2],
            trivial_predicates: &trivial,
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        let sorts = clause_variable_sorts(&p.signature, &p.clauses[0], 0).unwrap();
        grounder.ground_clause(&p.clauses[0], &sorts, &mut out);
        let f = FunctionId::from_index(0);
        let expected = enc.function_literal(f, &[2], 2, true);
        assert!(out.iter().any(|c| c.literals().contains(&expected)));
    }

    #[test]
    fn test_instance_estimate() {
        let sig = SortedSignature::single_sort(&[], &[2]);
        assert_eq!(estimate_instance_count(&sig, &[vec![0, 0], vec![0]], &[3]), 12);
    }
}
