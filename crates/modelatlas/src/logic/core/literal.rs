//! Literals in first-order logic

use super::term::{write_args, Term};
use crate::logic::interner::{Interner, PredicateId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate symbol with arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateSymbol {
    pub id: PredicateId,
    pub arity: u8,
}

impl PredicateSymbol {
    pub fn new(id: PredicateId, arity: u8) -> Self {
        PredicateSymbol { id, arity }
    }

    /// The binary equality predicate
    pub fn equality() -> Self {
        PredicateSymbol::new(PredicateId::EQUALITY, 2)
    }

    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_predicate(self.id)
    }
}

/// A literal (positive or negative atomic formula)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: PredicateSymbol,
    pub args: Vec<Term>,
    pub polarity: bool,
}

impl Literal {
    pub fn positive(predicate: PredicateSymbol, args: Vec<Term>) -> Self {
        Literal {
            predicate,
            args,
            polarity: true,
        }
    }

    pub fn negative(predicate: PredicateSymbol, args: Vec<Term>) -> Self {
        Literal {
            predicate,
            args,
            polarity: false,
        }
    }

    /// `left = right` with the given polarity
    pub fn equality(left: Term, right: Term, polarity: bool) -> Self {
        Literal {
            predicate: PredicateSymbol::equality(),
            args: vec![left, right],
            polarity,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.predicate.id.is_equality() && self.args.len() == 2
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> LiteralDisplay<'a> {
        LiteralDisplay {
            literal: self,
            interner,
        }
    }
}

/// Display wrapper for Literal that includes an interner for name resolution
pub struct LiteralDisplay<'a> {
    literal: &'a Literal,
    interner: &'a Interner,
}

impl<'a> fmt::Display for LiteralDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.literal;
        if lit.is_equality() {
            let op = if lit.polarity { "=" } else { "!=" };
            let (l, r) = (&lit.args[0], &lit.args[1]);
            return write!(f, "{} {} {}", l.display(self.interner), op, r.display(self.interner));
        }
        if !lit.polarity {
            f.write_str("~")?;
        }
        f.write_str(lit.predicate.name(self.interner))?;
        write_args(f, &lit.args, self.interner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_display() {
        let mut interner = Interner::new();
        let a = interner.intern_function("a");
        let b = interner.intern_function("b");
        let lit = Literal::equality(Term::constant(a), Term::constant(b), false);
        assert!(lit.is_equality());
        assert_eq!(lit.display(&interner).to_string(), "a != b");
        let pos = Literal::equality(Term::constant(a), Term::var(interner.intern_variable("X")), true);
        assert_eq!(pos.display(&interner).to_string(), "a = X");
    }

    #[test]
    fn test_propositional_display() {
        let mut interner = Interner::new();
        let p = interner.intern_predicate("p");
        let lit = Literal::negative(PredicateSymbol::new(p, 0), vec![]);
        assert!(!lit.is_equality());
        assert_eq!(lit.display(&interner).to_string(), "~p");
    }
}
