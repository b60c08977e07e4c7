//! Terms in first-order logic

use crate::logic::interner::{FunctionId, Interner, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A variable in first-order logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
}

impl Variable {
    pub fn new(id: VariableId) -> Self {
        Variable { id }
    }

    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_variable(self.id)
    }
}

/// A function symbol with arity; constants have arity 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub id: FunctionId,
    pub arity: u8,
}

impl FunctionSymbol {
    pub fn new(id: FunctionId, arity: u8) -> Self {
        FunctionSymbol { id, arity }
    }

    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_function(self.id)
    }
}

/// A term in first-order logic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(Variable),
    Function(FunctionSymbol, Vec<Term>),
}

impl Term {
    /// A constant is a zero-arity function application
    pub fn constant(id: FunctionId) -> Self {
        Term::Function(FunctionSymbol::new(id, 0), Vec::new())
    }

    pub fn var(id: VariableId) -> Self {
        Term::Variable(Variable::new(id))
    }

    /// True for terms without variables
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Function(_, args) => args.iter().all(Term::is_ground),
        }
    }

    pub fn as_constant(&self) -> Option<FunctionId> {
        match self {
            Term::Function(f, args) if args.is_empty() => Some(f.id),
            _ => None,
        }
    }

    pub fn collect_variable_ids(&self, vars: &mut HashSet<VariableId>) {
        match self {
            Term::Variable(v) => {
                vars.insert(v.id);
            }
            Term::Function(_, args) => {
                for arg in args {
                    arg.collect_variable_ids(vars);
                }
            }
        }
    }

    /// Visit every function symbol occurrence, outermost first
    pub fn for_each_function(&self, visit: &mut impl FnMut(FunctionSymbol)) {
        if let Term::Function(f, args) = self {
            visit(*f);
            for arg in args {
                arg.for_each_function(visit);
            }
        }
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> TermDisplay<'a> {
        TermDisplay {
            term: self,
            interner,
        }
    }
}

/// Display wrapper for Term that includes an interner for name resolution
pub struct TermDisplay<'a> {
    term: &'a Term,
    interner: &'a Interner,
}

/// `(a1,..,an)`, nothing for an empty list
pub(crate) fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term], interner: &Interner) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    let mut sep = "(";
    for arg in args {
        write!(f, "{}{}", sep, arg.display(interner))?;
        sep = ",";
    }
    f.write_str(")")
}

impl<'a> fmt::Display for TermDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Term::Variable(v) => f.write_str(v.name(self.interner)),
            Term::Function(func, args) => {
                f.write_str(func.name(self.interner))?;
                write_args(f, args, self.interner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_and_constants() {
        let mut interner = Interner::new();
        let a = interner.intern_function("a");
        let f = interner.intern_function("f");
        let x = interner.intern_variable("X");

        let ca = Term::constant(a);
        let fx = Term::Function(FunctionSymbol::new(f, 1), vec![Term::var(x)]);
        let fa = Term::Function(FunctionSymbol::new(f, 1), vec![ca.clone()]);

        assert!(ca.is_ground());
        assert!(fa.is_ground());
        assert!(!fx.is_ground());
        assert_eq!(ca.as_constant(), Some(a));
        assert_eq!(fa.as_constant(), None);
        assert_eq!(fx.display(&interner).to_string(), "f(X)");
    }

    #[test]
    fn test_function_visit_order() {
        let mut interner = Interner::new();
        let a = interner.intern_function("a");
        let f = interner.intern_function("f");
        let g = interner.intern_function("g");
        let t = Term::Function(
            FunctionSymbol::new(f, 1),
            vec![Term::Function(FunctionSymbol::new(g, 1), vec![Term::constant(a)])],
        );
        let mut seen = Vec::new();
        t.for_each_function(&mut |s| seen.push(s.id));
        assert_eq!(seen, vec![f, g, a]);
    }
}
