//! Symbol interning for variables, functions and predicates
//!
//! Every symbol kind lives in its own arena and is referred to by a typed
//! `u32` id. Constants are interned as zero-arity functions, so a model
//! builder only ever deals with two symbol families.
//!
//! Predicate id 0 is always the equality predicate `=`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// ID for an interned variable name
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) u32);

/// ID for an interned function symbol name (constants included)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) u32);

/// ID for an interned predicate symbol name
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(pub(crate) u32);

impl FunctionId {
    /// Position of this symbol in per-function tables
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> Self {
        FunctionId(index as u32)
    }
}

impl PredicateId {
    /// The reserved equality predicate
    pub const EQUALITY: PredicateId = PredicateId(0);

    /// Position of this symbol in per-predicate tables
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> Self {
        PredicateId(index as u32)
    }

    pub fn is_equality(self) -> bool {
        self == PredicateId::EQUALITY
    }
}

#[derive(Debug, Clone, Default)]
struct StringArena {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl StringArena {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    fn resolve(&self, id: u32) -> &str {
        &self.strings[id as usize]
    }

    fn get(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    fn len(&self) -> usize {
        self.strings.len()
    }
}

/// Symbol interner shared by the parser, the flattener and model printing.
///
/// Passed explicitly through the problem context; there is no global
/// symbol table.
#[derive(Debug, Clone)]
pub struct Interner {
    variables: StringArena,
    functions: StringArena,
    predicates: StringArena,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Create an interner holding only the equality predicate
    pub fn new() -> Self {
        let mut interner = Interner {
            variables: StringArena::default(),
            functions: StringArena::default(),
            predicates: StringArena::default(),
        };
        let eq = interner.predicates.intern("=");
        debug_assert_eq!(eq, PredicateId::EQUALITY.0);
        interner
    }

    // === Variables ===

    pub fn intern_variable(&mut self, name: &str) -> VariableId {
        VariableId(self.variables.intern(name))
    }

    pub fn resolve_variable(&self, id: VariableId) -> &str {
        self.variables.resolve(id.0)
    }

    // === Functions ===

    pub fn intern_function(&mut self, name: &str) -> FunctionId {
        FunctionId(self.functions.intern(name))
    }

    pub fn resolve_function(&self, id: FunctionId) -> &str {
        self.functions.resolve(id.0)
    }

    pub fn get_function(&self, name: &str) -> Option<FunctionId> {
        self.functions.get(name).map(FunctionId)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    // === Predicates ===

    pub fn intern_predicate(&mut self, name: &str) -> PredicateId {
        PredicateId(self.predicates.intern(name))
    }

    pub fn resolve_predicate(&self, id: PredicateId) -> &str {
        self.predicates.resolve(id.0)
    }

    pub fn get_predicate(&self, name: &str) -> Option<PredicateId> {
        self.predicates.get(name).map(PredicateId)
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// Ids serialize as bare integers; names are resolved by the JSON views.

macro_rules! serde_as_u32 {
    ($($id:ident),*) => {$(
        impl Serialize for $id {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $id {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                u32::deserialize(deserializer).map($id)
            }
        }
    )*};
}

serde_as_u32!(VariableId, FunctionId, PredicateId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_reserved() {
        let mut interner = Interner::new();
        assert_eq!(interner.get_predicate("="), Some(PredicateId::EQUALITY));
        let p = interner.intern_predicate("p");
        assert_ne!(p, PredicateId::EQUALITY);
        assert!(!p.is_equality());
        assert_eq!(interner.intern_predicate("="), PredicateId::EQUALITY);
    }

    #[test]
    fn test_function_interning() {
        let mut interner = Interner::new();
        let f = interner.intern_function("f");
        let a = interner.intern_function("a");
        assert_eq!(interner.intern_function("f"), f);
        assert_ne!(f, a);
        assert_eq!(interner.resolve_function(a), "a");
        assert_eq!(interner.function_count(), 2);
        assert_eq!(FunctionId::from_index(f.index()), f);
    }

    #[test]
    fn test_separate_namespaces() {
        let mut interner = Interner::new();
        let v = interner.intern_variable("x");
        let f = interner.intern_function("x");
        let p = interner.intern_predicate("x");

        assert_eq!(interner.resolve_variable(v), "x");
        assert_eq!(interner.resolve_function(f), "x");
        assert_eq!(interner.resolve_predicate(p), "x");
        assert_eq!(f.index(), 0);
        assert_eq!(p.index(), 1);
    }

    #[test]
    fn test_ids_serialize_as_integers() {
        let mut interner = Interner::new();
        interner.intern_function("a");
        let b = interner.intern_function("b");
        assert_eq!(serde_json::to_string(&b).unwrap(), "1");
        let back: FunctionId = serde_json::from_str("1").unwrap();
        assert_eq!(back, b);
    }
}
