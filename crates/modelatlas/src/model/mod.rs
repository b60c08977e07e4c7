//! Finite models and their evaluation
//!
//! Domain elements of a distinct sort of size `n` are `1..=n`. Tables are
//! indexed mixed-radix by the argument tuple and may have holes: an entry
//! the search left open, or a definition that failed to evaluate, stays
//! `None`.

use crate::error::EvalError;
use crate::logic::{Formula, FunctionId, Interner, PredicateId, Quantifier, Term, VariableId};
use std::collections::HashMap;
use std::fmt;

/// Assignment of quantified and definition variables to domain elements
pub type Valuation = HashMap<VariableId, u32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTable {
    /// Distinct sort of every argument
    pub arg_sorts: Vec<usize>,
    pub result_sort: usize,
    values: Vec<Option<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTable {
    pub arg_sorts: Vec<usize>,
    values: Vec<Option<bool>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteModel {
    sizes: Vec<u32>,
    functions: Vec<Option<FunctionTable>>,
    predicates: Vec<Option<PredicateTable>>,
}

fn table_len(sizes: &[u32], arg_sorts: &[usize]) -> usize {
    arg_sorts.iter().map(|&d| sizes[d] as usize).product()
}

/// Position of `args` in a table; `None` if an element is out of range
fn table_index(sizes: &[u32], arg_sorts: &[usize], args: &[u32]) -> Option<usize> {
    if args.len() != arg_sorts.len() {
        return None;
    }
    let mut index = 0usize;
    let mut mult = 1usize;
    for (&a, &d) in args.iter().zip(arg_sorts) {
        let size = sizes[d];
        if a == 0 || a > size {
            return None;
        }
        index += mult * (a as usize - 1);
        mult *= size as usize;
    }
    Some(index)
}

impl FiniteModel {
    pub fn new(sizes: Vec<u32>) -> Self {
        FiniteModel {
            sizes,
            functions: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Size of each distinct sort
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn declare_function(&mut self, f: FunctionId, arg_sorts: Vec<usize>, result_sort: usize) {
        if self.functions.len() <= f.index() {
            self.functions.resize(f.index() + 1, None);
        }
        let len = table_len(&self.sizes, &arg_sorts);
        self.functions[f.index()] = Some(FunctionTable {
            arg_sorts,
            result_sort,
            values: vec![None; len],
        });
    }

    pub fn declare_predicate(&mut self, p: PredicateId, arg_sorts: Vec<usize>) {
        if self.predicates.len() <= p.index() {
            self.predicates.resize(p.index() + 1, None);
        }
        let len = table_len(&self.sizes, &arg_sorts);
        self.predicates[p.index()] = Some(PredicateTable {
            arg_sorts,
            values: vec![None; len],
        });
    }

    /// Record `f(args) = value`; ignored for undeclared symbols or out-of-range tuples
    pub fn set_function(&mut self, f: FunctionId, args: &[u32], value: u32) {
        let sizes = &self.sizes;
        if let Some(Some(table)) = self.functions.get_mut(f.index()) {
            if let Some(i) = table_index(sizes, &table.arg_sorts, args) {
                table.values[i] = Some(value);
            }
        }
    }

    pub fn set_predicate(&mut self, p: PredicateId, args: &[u32], value: bool) {
        let sizes = &self.sizes;
        if let Some(Some(table)) = self.predicates.get_mut(p.index()) {
            if let Some(i) = table_index(sizes, &table.arg_sorts, args) {
                table.values[i] = Some(value);
            }
        }
    }

    pub fn function_table(&self, f: FunctionId) -> Option<&FunctionTable> {
        self.functions.get(f.index()).and_then(Option::as_ref)
    }

    pub fn predicate_table(&self, p: PredicateId) -> Option<&PredicateTable> {
        self.predicates.get(p.index()).and_then(Option::as_ref)
    }

    pub fn function_value(&self, f: FunctionId, args: &[u32]) -> Option<u32> {
        let table = self.function_table(f)?;
        table.values[table_index(&self.sizes, &table.arg_sorts, args)?]
    }

    pub fn constant_value(&self, c: FunctionId) -> Option<u32> {
        self.function_value(c, &[])
    }

    pub fn predicate_value(&self, p: PredicateId, args: &[u32]) -> Option<bool> {
        let table = self.predicate_table(p)?;
        table.values[table_index(&self.sizes, &table.arg_sorts, args)?]
    }

    /// Declared functions with their tables, in id order
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &FunctionTable)> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (FunctionId::from_index(i), t)))
    }

    pub fn predicates(&self) -> impl Iterator<Item = (PredicateId, &PredicateTable)> {
        self.predicates
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (PredicateId::from_index(i), t)))
    }

    /// Every argument tuple of a table with its entry
    fn entries<'a, T: Copy>(
        &'a self,
        arg_sorts: &'a [usize],
        values: &'a [Option<T>],
    ) -> impl Iterator<Item = (Vec<u32>, Option<T>)> + 'a {
        values.iter().enumerate().map(move |(mut index, &value)| {
            let mut args = Vec::with_capacity(arg_sorts.len());
            for &d in arg_sorts {
                let size = self.sizes[d] as usize;
                args.push((index % size) as u32 + 1);
                index /= size;
            }
            (args, value)
        })
    }

    pub fn function_entries<'a>(
        &'a self,
        table: &'a FunctionTable,
    ) -> impl Iterator<Item = (Vec<u32>, Option<u32>)> + 'a {
        self.entries(&table.arg_sorts, &table.values)
    }

    pub fn predicate_entries<'a>(
        &'a self,
        table: &'a PredicateTable,
    ) -> impl Iterator<Item = (Vec<u32>, Option<bool>)> + 'a {
        self.entries(&table.arg_sorts, &table.values)
    }

    /// Value of a term whose variables are bound by `valuation`
    pub fn eval_term(
        &self,
        term: &Term,
        valuation: &Valuation,
        interner: &Interner,
    ) -> Result<u32, EvalError> {
        match term {
            Term::Variable(v) => valuation
                .get(&v.id)
                .copied()
                .ok_or_else(|| EvalError::UnboundVariable(v.name(interner).to_string())),
            Term::Function(f, args) => {
                let args = args
                    .iter()
                    .map(|a| self.eval_term(a, valuation, interner))
                    .collect::<Result<Vec<u32>, _>>()?;
                self.function_value(f.id, &args)
                    .ok_or_else(|| EvalError::UndefinedFunction {
                        function: f.name(interner).to_string(),
                        args,
                    })
            }
        }
    }

    /// Truth value of a formula; quantifiers range over their distinct sort
    pub fn eval_formula(
        &self,
        formula: &Formula,
        valuation: &mut Valuation,
        interner: &Interner,
    ) -> Result<bool, EvalError> {
        match formula {
            Formula::True => Ok(true),
            Formula::False => Ok(false),
            Formula::Atom(lit) => {
                let args = lit
                    .args
                    .iter()
                    .map(|a| self.eval_term(a, valuation, interner))
                    .collect::<Result<Vec<u32>, _>>()?;
                let value = if lit.is_equality() {
                    args[0] == args[1]
                } else {
                    self.predicate_value(lit.predicate.id, &args).ok_or_else(|| {
                        EvalError::UndefinedPredicate {
                            predicate: lit.predicate.name(interner).to_string(),
                            args,
                        }
                    })?
                };
                Ok(value == lit.polarity)
            }
            Formula::Not(f) => Ok(!self.eval_formula(f, valuation, interner)?),
            Formula::And(fs) => {
                for f in fs {
                    if !self.eval_formula(f, valuation, interner)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Formula::Or(fs) => {
                for f in fs {
                    if self.eval_formula(f, valuation, interner)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Formula::Implies(l, r) => {
                Ok(!self.eval_formula(l, valuation, interner)? || self.eval_formula(r, valuation, interner)?)
            }
            Formula::Iff(l, r) => {
                Ok(self.eval_formula(l, valuation, interner)? == self.eval_formula(r, valuation, interner)?)
            }
            Formula::Quantified(q, var, sort, body) => {
                let saved = valuation.get(&var.id).copied();
                let mut result = matches!(q, Quantifier::Forall);
                for element in 1..=self.sizes[*sort] {
                    valuation.insert(var.id, element);
                    let value = match self.eval_formula(body, valuation, interner) {
                        Ok(v) => v,
                        Err(e) => {
                            restore(valuation, var.id, saved);
                            return Err(e);
                        }
                    };
                    if value != result {
                        result = value;
                        break;
                    }
                }
                restore(valuation, var.id, saved);
                Ok(result)
            }
        }
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> ModelDisplay<'a> {
        ModelDisplay {
            model: self,
            interner,
        }
    }
}

fn restore(valuation: &mut Valuation, var: VariableId, saved: Option<u32>) {
    match saved {
        Some(v) => valuation.insert(var, v),
        None => valuation.remove(&var),
    };
}

/// Human-readable listing of a model
pub struct ModelDisplay<'a> {
    model: &'a FiniteModel,
    interner: &'a Interner,
}

fn tuple(args: &[u32]) -> String {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    args.join(",")
}

impl<'a> fmt::Display for ModelDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;
        writeln!(f, "% domain sizes: [{}]", tuple(&model.sizes))?;
        for (id, table) in model.functions() {
            let name = self.interner.resolve_function(id);
            for (args, value) in model.function_entries(table) {
                let Some(value) = value else { continue };
                if args.is_empty() {
                    writeln!(f, "{} = {}", name, value)?;
                } else {
                    writeln!(f, "{}({}) = {}", name, tuple(&args), value)?;
                }
            }
        }
        for (id, table) in model.predicates() {
            let name = self.interner.resolve_predicate(id);
            for (args, value) in model.predicate_entries(table) {
                let Some(value) = value else { continue };
                let sign = if value { "" } else { "~" };
                if args.is_empty() {
                    writeln!(f, "{}{}", sign, name)?;
                } else {
                    writeln!(f, "{}{}({})", sign, name, tuple(&args))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Literal, PredicateSymbol, Variable};

    struct Fixture {
        interner: Interner,
        model: FiniteModel,
        a: FunctionId,
        f: FunctionId,
        p: PredicateId,
    }

    /// size 2, a = 1, f(1) = 2, f(2) = 1, p(1) true, p(2) false
    fn fixture() -> Fixture {
        let mut interner = Interner::new();
        let a = interner.intern_function("a");
        let f = interner.intern_function("f");
        let p = interner.intern_predicate("p");
        let mut model = FiniteModel::new(vec![2]);
        model.declare_function(a, vec![], 0);
        model.declare_function(f, vec![0], 0);
        model.declare_predicate(p, vec![0]);
        model.set_function(a, &[], 1);
        model.set_function(f, &[1], 2);
        model.set_function(f, &[2], 1);
        model.set_predicate(p, &[1], true);
        model.set_predicate(p, &[2], false);
        Fixture {
            interner,
            model,
            a,
            f,
            p,
        }
    }

    fn f_of(f: FunctionId, arg: Term) -> Term {
        Term::Function(crate::logic::FunctionSymbol::new(f, 1), vec![arg])
    }

    #[test]
    fn test_tables() {
        let fx = fixture();
        assert_eq!(fx.model.constant_value(fx.a), Some(1));
        assert_eq!(fx.model.function_value(fx.f, &[2]), Some(1));
        assert_eq!(fx.model.function_value(fx.f, &[3]), None);
        assert_eq!(fx.model.predicate_value(fx.p, &[2]), Some(false));
        let entries: Vec<_> = fx
            .model
            .function_entries(fx.model.function_table(fx.f).unwrap())
            .collect();
        assert_eq!(entries, vec![(vec![1], Some(2)), (vec![2], Some(1))]);
    }

    #[test]
    fn test_eval_term() {
        let fx = fixture();
        let term = f_of(fx.f, f_of(fx.f, Term::constant(fx.a)));
        assert_eq!(fx.model.eval_term(&term, &Valuation::new(), &fx.interner), Ok(1));
    }

    #[test]
    fn test_eval_quantified_formula() {
        let mut fx = fixture();
        let x = Variable::new(fx.interner.intern_variable("X"));
        let p = PredicateSymbol::new(fx.p, 1);
        // ! [X] : (p(X) | p(f(X)))
        let body = Formula::Or(vec![
            Formula::Atom(Literal::positive(p, vec![Term::Variable(x)])),
            Formula::Atom(Literal::positive(p, vec![f_of(fx.f, Term::Variable(x))])),
        ]);
        let all = Formula::Quantified(Quantifier::Forall, x, 0, Box::new(body.clone()));
        let mut valuation = Valuation::new();
        assert_eq!(fx.model.eval_formula(&all, &mut valuation, &fx.interner), Ok(true));
        assert!(valuation.is_empty());

        // ? [X] : X != f(X) & ~p(X)
        let neq = Formula::Atom(Literal::equality(
            Term::Variable(x),
            f_of(fx.f, Term::Variable(x)),
            false,
        ));
        let not_p = Formula::Atom(Literal::negative(p, vec![Term::Variable(x)]));
        let some = Formula::Quantified(
            Quantifier::Exists,
            x,
            0,
            Box::new(Formula::And(vec![neq, not_p])),
        );
        assert_eq!(fx.model.eval_formula(&some, &mut valuation, &fx.interner), Ok(true));
    }

    #[test]
    fn test_eval_reports_holes() {
        let mut fx = fixture();
        let g = fx.interner.intern_function("g");
        fx.model.declare_function(g, vec![0], 0);
        let term = f_of(g, Term::constant(fx.a));
        assert!(matches!(
            fx.model.eval_term(&term, &Valuation::new(), &fx.interner),
            Err(EvalError::UndefinedFunction { .. })
        ));
        let x = fx.interner.intern_variable("X");
        assert!(matches!(
            fx.model.eval_term(&Term::var(x), &Valuation::new(), &fx.interner),
            Err(EvalError::UnboundVariable(_))
        ));
    }

    #[test]
    fn test_display() {
        let fx = fixture();
        let text = fx.model.display(&fx.interner).to_string();
        assert!(text.starts_with("% domain sizes: [2]\n"));
        assert!(text.contains("a = 1\n"));
        assert!(text.contains("f(1) = 2\n"));
        assert!(text.contains("~p(2)\n"));
    }
}
