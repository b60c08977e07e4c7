//! Flattening of untyped CNF into a single-sorted [`FmbProblem`]

use super::{max_clique_size, FlatClause, FlatLiteral, FmbProblem, SortedSignature};
use crate::error::ProblemError;
use crate::logic::{CNFFormula, Clause, FunctionId, Interner, Literal, Term, VariableId};
use std::collections::HashMap;
use tracing::debug;

impl FmbProblem {
    /// Build a problem from parsed CNF with every symbol in one sort.
    ///
    /// Nested terms are named by fresh variables (`f(g(X)) = a` becomes
    /// `g(X) != Y | a != Z | f(Y) = Z`). `t != t` literals are removed and
    /// tautologies dropped; a clause left empty marks the problem as
    /// trivially unsatisfiable. Unit clauses `a != b` between constants feed
    /// the minimum domain size.
    pub fn from_cnf(cnf: CNFFormula, interner: Interner) -> Result<Self, ProblemError> {
        let (function_arities, predicate_arities) = collect_arities(&cnf, &interner)?;

        let mut problem = FmbProblem {
            signature: SortedSignature::single_sort(&function_arities, &predicate_arities),
            function_usage: vec![0; function_arities.len()],
            distinct_sort_mins: vec![1],
            ..FmbProblem::default()
        };

        let mut distinct_constants: Vec<(FunctionId, FunctionId)> = Vec::new();

        for clause in &cnf.clauses {
            let Some(clause) = simplify(clause) else {
                continue;
            };
            if clause.is_empty() {
                problem.contains_empty_clause = true;
                continue;
            }
            if let [lit] = clause.literals.as_slice() {
                if lit.is_equality() && !lit.polarity {
                    if let (Some(a), Some(b)) = (lit.args[0].as_constant(), lit.args[1].as_constant()) {
                        distinct_constants.push((a.min(b), a.max(b)));
                    }
                }
            }

            let flat = ClauseFlattener::default().flatten(&clause);
            for lit in &flat.literals {
                if let FlatLiteral::Function { function, .. } = lit {
                    problem.function_usage[function.index()] += 1;
                }
            }
            if flat.is_ground() {
                problem.ground_clauses.push(flat);
            } else {
                problem.clauses.push(flat);
            }
        }

        let clique = max_clique_size(&distinct_constants) as u32;
        if clique > 1 {
            debug!(clique, "distinct constants force a minimum domain size");
            problem.distinct_sort_mins[0] = clique;
        }

        problem.interner = interner;
        Ok(problem)
    }
}

fn collect_arities(
    cnf: &CNFFormula,
    interner: &Interner,
) -> Result<(Vec<usize>, Vec<usize>), ProblemError> {
    let mut functions: Vec<Option<usize>> = vec![None; interner.function_count()];
    let mut predicates: Vec<Option<usize>> = vec![None; interner.predicate_count()];
    predicates[0] = Some(2);

    fn record(
        slot: &mut Option<usize>,
        arity: usize,
        name: &str,
    ) -> Result<(), ProblemError> {
        match *slot {
            Some(first) if first != arity => Err(ProblemError::ArityMismatch {
                name: name.to_string(),
                first,
                second: arity,
            }),
            _ => {
                *slot = Some(arity);
                Ok(())
            }
        }
    }

    fn visit(
        term: &Term,
        functions: &mut [Option<usize>],
        interner: &Interner,
    ) -> Result<(), ProblemError> {
        if let Term::Function(f, args) = term {
            record(&mut functions[f.id.index()], args.len(), interner.resolve_function(f.id))?;
            for arg in args {
                visit(arg, functions, interner)?;
            }
        }
        Ok(())
    }

    for clause in &cnf.clauses {
        for lit in &clause.literals {
            if !lit.predicate.id.is_equality() {
                record(
                    &mut predicates[lit.predicate.id.index()],
                    lit.args.len(),
                    interner.resolve_predicate(lit.predicate.id),
                )?;
            }
            for arg in &lit.args {
                visit(arg, &mut functions, interner)?;
            }
        }
    }

    Ok((
        functions.into_iter().map(|a| a.unwrap_or(0)).collect(),
        predicates.into_iter().map(|a| a.unwrap_or(0)).collect(),
    ))
}

/// Drop `t != t` literals and duplicates; `None` for tautologies
fn simplify(clause: &Clause) -> Option<Clause> {
    if clause.is_tautology() {
        return None;
    }
    let mut literals: Vec<Literal> = Vec::with_capacity(clause.literals.len());
    for lit in &clause.literals {
        if lit.is_equality() && !lit.polarity && lit.args[0] == lit.args[1] {
            continue;
        }
        if !literals.contains(lit) {
            literals.push(lit.clone());
        }
    }
    Some(Clause::with_role(literals, clause.role))
}

#[derive(Default)]
struct ClauseFlattener {
    variables: HashMap<VariableId, u32>,
    named: HashMap<Term, u32>,
    next: u32,
    literals: Vec<FlatLiteral>,
}

impl ClauseFlattener {
    fn flatten(mut self, clause: &Clause) -> FlatClause {
        for lit in &clause.literals {
            self.flatten_literal(lit);
        }
        FlatClause {
            literals: self.literals,
            variables: self.next,
        }
    }

    fn fresh(&mut self) -> u32 {
        let v = self.next;
        self.next += 1;
        v
    }

    fn variable(&mut self, id: VariableId) -> u32 {
        if let Some(&v) = self.variables.get(&id) {
            return v;
        }
        let v = self.fresh();
        self.variables.insert(id, v);
        v
    }

    /// Variable standing for `term`, defining it with `f(..) != Y` if needed
    fn name_term(&mut self, term: &Term) -> u32 {
        match term {
            Term::Variable(v) => self.variable(v.id),
            Term::Function(f, args) => {
                if let Some(&v) = self.named.get(term) {
                    return v;
                }
                let args = args.iter().map(|a| self.name_term(a)).collect();
                let result = self.fresh();
                self.literals.push(FlatLiteral::Function {
                    function: f.id,
                    args,
                    result,
                    polarity: false,
                });
                self.named.insert(term.clone(), result);
                result
            }
        }
    }

    fn flatten_literal(&mut self, lit: &Literal) {
        if !lit.is_equality() {
            let args = lit.args.iter().map(|a| self.name_term(a)).collect();
            self.literals.push(FlatLiteral::Predicate {
                predicate: lit.predicate.id,
                args,
                polarity: lit.polarity,
            });
            return;
        }

        let (left, right) = (&lit.args[0], &lit.args[1]);
        match (left, right) {
            (Term::Variable(x), Term::Variable(y)) => {
                let left = self.variable(x.id);
                let right = self.variable(y.id);
                self.literals.push(FlatLiteral::VarEquality {
                    left,
                    right,
                    polarity: lit.polarity,
                    distinct_sort: 0,
                });
            }
            (Term::Variable(x), Term::Function(f, args))
            | (Term::Function(f, args), Term::Variable(x)) => {
                let result = self.variable(x.id);
                let args = args.iter().map(|a| self.name_term(a)).collect();
                self.literals.push(FlatLiteral::Function {
                    function: f.id,
                    args,
                    result,
                    polarity: lit.polarity,
                });
            }
            (Term::Function(f, args), other) => {
                let result = self.name_term(other);
                let args = args.iter().map(|a| self.name_term(a)).collect();
                self.literals.push(FlatLiteral::Function {
                    function: f.id,
                    args,
                    result,
                    polarity: lit.polarity,
                });
            }
        }
    }
}
