//! Reading a finite model out of a satisfying assignment

use super::encoder::VariableEncoder;
use super::odometer::Odometer;
use crate::logic::{FunctionId, PredicateId};
use crate::model::{FiniteModel, Valuation};
use crate::problem::{FmbProblem, PredicateDefinition};
use crate::sat::SatOracle;
use tracing::debug;

pub struct ModelExtractor<'a> {
    pub problem: &'a FmbProblem,
    pub encoder: &'a VariableEncoder,
    pub oracle: &'a dyn SatOracle,
    pub live_functions: &'a [bool],
    pub live_predicates: &'a [bool],
    /// Distinct sizes the round was encoded with
    pub encoded_sizes: &'a [u32],
    /// Distinct sizes of the model; never above `encoded_sizes`
    pub model_sizes: &'a [u32],
}

impl<'a> ModelExtractor<'a> {
    pub fn extract(&self) -> FiniteModel {
        let mut model = FiniteModel::new(self.model_sizes.to_vec());

        for (f, &live) in self.live_functions.iter().enumerate() {
            if live {
                self.read_function(FunctionId::from_index(f), &mut model);
            }
        }
        for (p, &live) in self.live_predicates.iter().enumerate() {
            let p = PredicateId::from_index(p);
            if live && !self.problem.partially_deleted_predicates.contains_key(&p) {
                self.read_predicate(p, &mut model);
            }
        }
        for (&p, &value) in &self.problem.trivial_predicates {
            if p.is_equality() || self.problem.is_predicate_deleted(p) {
                continue;
            }
            let arg_sorts = self.distinct_arg_sorts(&self.problem.signature.predicate_signatures[p.index()]);
            fill_predicate(&mut model, p, arg_sorts, value);
        }

        self.evaluate_deleted_functions(&mut model);
        self.evaluate_deleted_predicates(&mut model);
        model
    }

    fn distinct_arg_sorts(&self, sorts: &[usize]) -> Vec<usize> {
        sorts.iter().map(|&s| self.problem.signature.parent(s)).collect()
    }

    /// Argument tuples of the model with the grounding the encoding used for them
    fn groundings(&self, sorts: &[usize]) -> (Odometer, Vec<u32>) {
        let signature = &self.problem.signature;
        let bounds = sorts
            .iter()
            .map(|&s| self.model_sizes[signature.parent(s)])
            .collect();
        let caps = sorts.iter().map(|&s| signature.bound(s)).collect();
        (Odometer::new(bounds), caps)
    }

    fn read_function(&self, f: FunctionId, model: &mut FiniteModel) {
        let signature = &self.problem.signature;
        let ret_sort = signature.return_sort(f);
        let max_value = signature.bounded_size(ret_sort, self.encoded_sizes);
        let arg_sorts = signature.arg_sorts(f);
        model.declare_function(f, self.distinct_arg_sorts(arg_sorts), signature.parent(ret_sort));

        let (mut odometer, caps) = self.groundings(arg_sorts);
        let mut capped = Vec::with_capacity(arg_sorts.len());
        while let Some(args) = odometer.next_tuple() {
            capped.clear();
            capped.extend(args.iter().zip(&caps).map(|(&a, &cap)| a.min(cap)));
            let mut values = (1..=max_value)
                .filter(|&v| self.oracle.true_in_assignment(self.encoder.function_literal(f, &capped, v, true)));
            match values.next() {
                Some(value) => {
                    debug_assert!(values.next().is_none(), "function with two values");
                    model.set_function(f, args, value);
                }
                None => {
                    debug_assert!(!args.is_empty(), "constant without a value");
                }
            }
        }
    }

    fn read_predicate(&self, p: PredicateId, model: &mut FiniteModel) {
        let sorts = &self.problem.signature.predicate_signatures[p.index()];
        model.declare_predicate(p, self.distinct_arg_sorts(sorts));
        let (mut odometer, caps) = self.groundings(sorts);
        let mut capped = Vec::with_capacity(sorts.len());
        while let Some(args) = odometer.next_tuple() {
            capped.clear();
            capped.extend(args.iter().zip(&caps).map(|(&a, &cap)| a.min(cap)));
            let value = self
                .oracle
                .true_in_assignment(self.encoder.predicate_literal(p, &capped, true));
            model.set_predicate(p, args, value);
        }
    }

    /// Replay definitions of eliminated functions, highest id first
    fn evaluate_deleted_functions(&self, model: &mut FiniteModel) {
        let interner = &self.problem.interner;
        let mut deleted: Vec<_> = self.problem.deleted_functions.iter().collect();
        deleted.sort_by_key(|(f, _)| std::cmp::Reverse(**f));

        for (&f, def) in deleted {
            let arg_sorts: Vec<usize> = def.args.iter().map(|(_, d)| *d).collect();
            model.declare_function(f, arg_sorts.clone(), def.result_sort);
            let bounds = arg_sorts.iter().map(|&d| self.model_sizes[d]).collect();
            let mut odometer = Odometer::new(bounds);
            let mut failures = 0usize;
            while let Some(args) = odometer.next_tuple() {
                let valuation: Valuation = def
                    .args
                    .iter()
                    .zip(args)
                    .map(|((v, _), &a)| (v.id, a))
                    .collect();
                match model.eval_term(&def.body, &valuation, interner) {
                    Ok(value) => model.set_function(f, args, value),
                    Err(_) => failures += 1,
                }
            }
            if failures > 0 {
                debug!(
                    function = interner.resolve_function(f),
                    failures, "definition left entries undefined"
                );
            }
        }
    }

    /// Replay definitions of eliminated predicates, highest id first
    fn evaluate_deleted_predicates(&self, model: &mut FiniteModel) {
        let interner = &self.problem.interner;
        let mut defined: Vec<_> = self
            .problem
            .deleted_predicates
            .iter()
            .chain(&self.problem.partially_deleted_predicates)
            .filter(|(p, _)| !self.problem.trivial_predicates.contains_key(*p))
            .collect();
        defined.sort_by_key(|(p, _)| std::cmp::Reverse(**p));

        for (&p, def) in defined {
            match def {
                PredicateDefinition::Constant(value) => {
                    let arg_sorts =
                        self.distinct_arg_sorts(&self.problem.signature.predicate_signatures[p.index()]);
                    fill_predicate(model, p, arg_sorts, *value);
                }
                PredicateDefinition::Equivalence {
                    args: vars,
                    body,
                    polarity,
                } => {
                    let arg_sorts: Vec<usize> = vars.iter().map(|(_, d)| *d).collect();
                    model.declare_predicate(p, arg_sorts.clone());
                    let bounds = arg_sorts.iter().map(|&d| self.model_sizes[d]).collect();
                    let mut odometer = Odometer::new(bounds);
                    while let Some(args) = odometer.next_tuple() {
                        let mut valuation: Valuation = vars
                            .iter()
                            .zip(args)
                            .map(|((v, _), &a)| (v.id, a))
                            .collect();
                        if let Ok(value) = model.eval_formula(body, &mut valuation, interner) {
                            model.set_predicate(p, args, value == *polarity);
                        }
                    }
                }
            }
        }
    }
}

fn fill_predicate(model: &mut FiniteModel, p: PredicateId, arg_sorts: Vec<usize>, value: bool) {
    let bounds = arg_sorts.iter().map(|&d| model.sizes()[d]).collect();
    model.declare_predicate(p, arg_sorts);
    let mut odometer = Odometer::new(bounds);
    while let Some(args) = odometer.next_tuple() {
        model.set_predicate(p, args, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Formula, FunctionSymbol, Interner, Literal, Term, Variable};
    use crate::problem::{FunctionDefinition, SortedSignature};
    use crate::sat::{BatsatOracle, ClauseBuffer, SatStatus};

    /// a/0 and f/1 encoded, g/1 deleted with g(X) = f(f(X)), q/1 deleted with q(X) <=> X = a
    fn problem() -> FmbProblem {
        let mut interner = Interner::new();
        let a = interner.intern_function("a");
        let f = interner.intern_function("f");
        let g = interner.intern_function("g");
        let q = interner.intern_predicate("q");
        let x = Variable::new(interner.intern_variable("X"));

        let f_of = |t: Term| Term::Function(FunctionSymbol::new(f, 1), vec![t]);
        let mut problem = FmbProblem {
            signature: SortedSignature::single_sort(&[0, 1, 1], &[2, 1]),
            ..FmbProblem::default()
        };
        problem.deleted_functions.insert(
            g,
            FunctionDefinition {
                args: vec![(x, 0)],
                result_sort: 0,
                body: f_of(f_of(Term::Variable(x))),
            },
        );
        problem.deleted_predicates.insert(
            q,
            PredicateDefinition::Equivalence {
                args: vec![(x, 0)],
                body: Formula::Atom(Literal::equality(Term::Variable(x), Term::constant(a), true)),
                polarity: true,
            },
        );
        problem.interner = interner;
        problem
    }

    #[test]
    fn test_extract_and_back_fill() {
        let problem = problem();
        let live_functions = [true, true, false];
        let live_predicates = [false, false];
        let enc = VariableEncoder::new(&problem.signature, &live_functions, &live_predicates, &[2], false, 1000)
            .unwrap();
        let a = FunctionId::from_index(0);
        let f = FunctionId::from_index(1);

        // a = 2, f(1) = 2, f(2) = 1
        let mut out = ClauseBuffer::new();
        out.add(vec![enc.function_literal(a, &[], 2, true)]);
        out.add(vec![enc.function_literal(a, &[], 1, false)]);
        out.add(vec![enc.function_literal(f, &[1], 2, true)]);
        out.add(vec![enc.function_literal(f, &[1], 1, false)]);
        out.add(vec![enc.function_literal(f, &[2], 1, true)]);
        out.add(vec![enc.function_literal(f, &[2], 2, false)]);
        let mut oracle = BatsatOracle::new();
        oracle.ensure_var_count(enc.max_var()).unwrap();
        out.submit(&mut oracle).unwrap();
        assert_eq!(oracle.solve_under_assumptions(&[]), SatStatus::Satisfiable);

        let model = ModelExtractor {
            problem: &problem,
            encoder: &enc,
            oracle: &oracle,
            live_functions: &live_functions,
            live_predicates: &live_predicates,
            encoded_sizes: &[2],
            model_sizes: &[2],
        }
        .extract();

        assert_eq!(model.constant_value(a), Some(2));
        assert_eq!(model.function_value(f, &[1]), Some(2));
        let g = FunctionId::from_index(2);
        assert_eq!(model.function_value(g, &[1]), Some(1));
        assert_eq!(model.function_value(g, &[2]), Some(2));
        let q = PredicateId::from_index(1);
        assert_eq!(model.predicate_value(q, &[1]), Some(false));
        assert_eq!(model.predicate_value(q, &[2]), Some(true));
    }

    #[test]
    fn test_trivial_predicates_fill_their_table() {
        let mut problem = problem();
        problem.deleted_predicates.clear();
        let q = PredicateId::from_index(1);
        problem.trivial_predicates.insert(q, true);
        let live_functions = [true, true, false];
        let enc = VariableEncoder::new(&problem.signature, &live_functions, &[false, false], &[1], false, 1000)
            .unwrap();
        let mut oracle = BatsatOracle::new();
        oracle.ensure_var_count(enc.max_var()).unwrap();
        let mut out = ClauseBuffer::new();
        out.add(vec![enc.function_literal(FunctionId::from_index(0), &[], 1, true)]);
        out.add(vec![enc.function_literal(FunctionId::from_index(1), &[1], 1, true)]);
        out.submit(&mut oracle).unwrap();
        assert_eq!(oracle.solve_under_assumptions(&[]), SatStatus::Satisfiable);

        let model = ModelExtractor {
            problem: &problem,
            encoder: &enc,
            oracle: &oracle,
            live_functions: &live_functions,
            live_predicates: &[false, false],
            encoded_sizes: &[1],
            model_sizes: &[1],
        }
        .extract();
        assert_eq!(model.predicate_value(q, &[1]), Some(true));
    }
}
