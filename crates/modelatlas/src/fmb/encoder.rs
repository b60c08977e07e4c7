//! Propositional variable layout for one round
//!
//! Every live function `f` of arity `n` owns the variables for
//! `f(x1..xn) = y`, every live predicate the variables for `p(x1..xn)`.
//! A symbol's block starts at its offset and is indexed mixed-radix by the
//! grounding, first position least significant, each position's radix
//! being the current size of its sort. Growth markers follow the symbol
//! blocks.

use crate::error::EncodingError;
use crate::logic::{FunctionId, PredicateId};
use crate::problem::SortedSignature;
use crate::sat::SatLiteral;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Function(FunctionId),
    Predicate(PredicateId),
}

/// What a propositional variable stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Symbol and grounding; functions carry the result as last entry
    Atom(Symbol, Vec<u32>),
    TotalityMarker(usize),
    InstancesMarker(usize),
    /// Distinct sort and marker index
    SizeMarker(usize, u32),
}

#[derive(Debug, Clone)]
struct Block {
    symbol: Symbol,
    offset: u32,
    radices: Vec<u32>,
    len: u32,
}

#[derive(Debug, Clone)]
enum Markers {
    /// `totality[d]` and `instances[d]` are single variables
    PerSort {
        totality: Vec<u32>,
        instances: Vec<u32>,
    },
    /// `offsets[d] + j` stands for "sort d needs more than j + 1 elements"
    PerSize { offsets: Vec<u32>, sizes: Vec<u32> },
}

/// Offset table and marker ranges for the current size vector
#[derive(Debug, Clone)]
pub struct VariableEncoder {
    blocks: Vec<Block>,
    function_blocks: Vec<Option<usize>>,
    predicate_blocks: Vec<Option<usize>>,
    markers: Markers,
    max_var: u32,
}

struct Allocator {
    next: u32,
    var_max: u32,
}

impl Allocator {
    /// Reserve `len` consecutive variables and return the first
    fn reserve(&mut self, len: u32, what: impl FnOnce() -> String) -> Result<u32, EncodingError> {
        let start = self.next;
        let end = start
            .checked_add(len)
            .filter(|&end| end - 1 <= self.var_max)
            .ok_or_else(|| EncodingError::Overflow { what: what() })?;
        self.next = end;
        Ok(start)
    }
}

impl VariableEncoder {
    /// Lay out variables for the live symbols under `distinct_sizes`.
    ///
    /// `per_size_markers` selects one marker per candidate size instead of
    /// the totality/instances pair per distinct sort.
    pub fn new(
        signature: &SortedSignature,
        live_functions: &[bool],
        live_predicates: &[bool],
        distinct_sizes: &[u32],
        per_size_markers: bool,
        var_max: u32,
    ) -> Result<Self, EncodingError> {
        let sort_sizes = signature.sort_sizes(distinct_sizes);
        let mut alloc = Allocator { next: 1, var_max };
        let mut blocks = Vec::new();
        let mut function_blocks = vec![None; signature.function_count()];
        let mut predicate_blocks = vec![None; signature.predicate_count()];

        for (f, sig) in signature.function_signatures.iter().enumerate() {
            if !live_functions.get(f).copied().unwrap_or(false) {
                continue;
            }
            let radices: Vec<u32> = sig.iter().map(|&s| sort_sizes[s]).collect();
            let symbol = Symbol::Function(FunctionId::from_index(f));
            let block = allocate(&mut alloc, symbol, radices)?;
            function_blocks[f] = Some(blocks.len());
            blocks.push(block);
        }

        for (p, sig) in signature.predicate_signatures.iter().enumerate() {
            let id = PredicateId::from_index(p);
            if id.is_equality() || !live_predicates.get(p).copied().unwrap_or(false) {
                continue;
            }
            let radices: Vec<u32> = sig.iter().map(|&s| sort_sizes[s]).collect();
            let block = allocate(&mut alloc, Symbol::Predicate(id), radices)?;
            predicate_blocks[p] = Some(blocks.len());
            blocks.push(block);
        }

        let distinct = distinct_sizes.len();
        let markers = if per_size_markers {
            let mut offsets = Vec::with_capacity(distinct);
            for (d, &size) in distinct_sizes.iter().enumerate() {
                offsets.push(alloc.reserve(size, || format!("size markers of sort {}", d))?);
            }
            Markers::PerSize {
                offsets,
                sizes: distinct_sizes.to_vec(),
            }
        } else {
            let totality = alloc.reserve(distinct as u32, || "totality markers".to_string())?;
            let instances = alloc.reserve(distinct as u32, || "instance markers".to_string())?;
            Markers::PerSort {
                totality: (0..distinct as u32).map(|d| totality + d).collect(),
                instances: (0..distinct as u32).map(|d| instances + d).collect(),
            }
        };

        Ok(VariableEncoder {
            blocks,
            function_blocks,
            predicate_blocks,
            markers,
            max_var: alloc.next - 1,
        })
    }

    /// Highest variable id in use
    pub fn max_var(&self) -> u32 {
        self.max_var
    }

    fn block(&self, symbol: Symbol) -> &Block {
        let index = match symbol {
            Symbol::Function(f) => self.function_blocks[f.index()],
            Symbol::Predicate(p) => self.predicate_blocks[p.index()],
        };
        match index {
            Some(i) => &self.blocks[i],
            None => panic!("{:?} has no variables in this round", symbol),
        }
    }

    pub fn is_encoded(&self, symbol: Symbol) -> bool {
        match symbol {
            Symbol::Function(f) => self.function_blocks.get(f.index()).is_some_and(Option::is_some),
            Symbol::Predicate(p) => self.predicate_blocks.get(p.index()).is_some_and(Option::is_some),
        }
    }

    /// Literal for `symbol(grounding)`; for functions the last entry is the result
    pub fn literal(&self, symbol: Symbol, grounding: &[u32], polarity: bool) -> SatLiteral {
        let block = self.block(symbol);
        debug_assert_eq!(block.radices.len(), grounding.len());
        let mut var = block.offset;
        let mut mult = 1u32;
        for (&g, &radix) in grounding.iter().zip(&block.radices) {
            debug_assert!(g >= 1 && g <= radix, "grounding {} outside 1..={}", g, radix);
            var += mult * (g - 1);
            mult = mult.wrapping_mul(radix);
        }
        SatLiteral::new(var, polarity)
    }

    /// `f(args) = value`
    pub fn function_literal(&self, f: FunctionId, args: &[u32], value: u32, polarity: bool) -> SatLiteral {
        let mut grounding = Vec::with_capacity(args.len() + 1);
        grounding.extend_from_slice(args);
        grounding.push(value);
        self.literal(Symbol::Function(f), &grounding, polarity)
    }

    pub fn predicate_literal(&self, p: PredicateId, args: &[u32], polarity: bool) -> SatLiteral {
        self.literal(Symbol::Predicate(p), args, polarity)
    }

    pub fn totality_marker(&self, distinct_sort: usize, polarity: bool) -> SatLiteral {
        match &self.markers {
            Markers::PerSort { totality, .. } => SatLiteral::new(totality[distinct_sort], polarity),
            Markers::PerSize { .. } => panic!("totality markers exist only without size markers"),
        }
    }

    pub fn instances_marker(&self, distinct_sort: usize, polarity: bool) -> SatLiteral {
        match &self.markers {
            Markers::PerSort { instances, .. } => SatLiteral::new(instances[distinct_sort], polarity),
            Markers::PerSize { .. } => panic!("instance markers exist only without size markers"),
        }
    }

    /// Marker `j` of a distinct sort: true when the sort needs more than `j + 1` elements
    pub fn size_marker(&self, distinct_sort: usize, j: u32, polarity: bool) -> SatLiteral {
        match &self.markers {
            Markers::PerSize { offsets, sizes } => {
                debug_assert!(j < sizes[distinct_sort]);
                SatLiteral::new(offsets[distinct_sort] + j, polarity)
            }
            Markers::PerSort { .. } => panic!("size markers exist only in the contour encoding"),
        }
    }

    /// Inverse of the layout
    pub fn decode(&self, var: u32) -> Option<Decoded> {
        if var == 0 || var > self.max_var {
            return None;
        }
        let pos = self.blocks.partition_point(|b| b.offset <= var);
        if pos > 0 {
            let block = &self.blocks[pos - 1];
            if var < block.offset + block.len {
                let mut rest = var - block.offset;
                let mut grounding = Vec::with_capacity(block.radices.len());
                for &radix in &block.radices {
                    grounding.push(rest % radix + 1);
                    rest /= radix;
                }
                return Some(Decoded::Atom(block.symbol, grounding));
            }
        }
        match &self.markers {
            Markers::PerSort {
                totality,
                instances,
            } => {
                if let Some(d) = totality.iter().position(|&v| v == var) {
                    return Some(Decoded::TotalityMarker(d));
                }
                instances
                    .iter()
                    .position(|&v| v == var)
                    .map(Decoded::InstancesMarker)
            }
            Markers::PerSize { offsets, sizes } => offsets
                .iter()
                .zip(sizes)
                .position(|(&o, &s)| var >= o && var < o + s)
                .map(|d| Decoded::SizeMarker(d, var - offsets[d])),
        }
    }
}

fn allocate(alloc: &mut Allocator, symbol: Symbol, radices: Vec<u32>) -> Result<Block, EncodingError> {
    let len = radices
        .iter()
        .try_fold(1u32, |acc, &r| acc.checked_mul(r))
        .ok_or_else(|| EncodingError::Overflow {
            what: format!("{:?}", symbol),
        })?;
    let offset = alloc.reserve(len, || format!("{:?}", symbol))?;
    Ok(Block {
        symbol,
        offset,
        radices,
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a/0, f/1, g/2 and predicates =, p/1, q/0 over one sort
    fn signature() -> SortedSignature {
        SortedSignature::single_sort(&[0, 1, 2], &[2, 1, 0])
    }

    fn encoder(size: u32, per_size: bool) -> VariableEncoder {
        VariableEncoder::new(&signature(), &[true; 3], &[true; 3], &[size], per_size, u32::MAX >> 2)
            .unwrap()
    }

    #[test]
    fn test_layout_is_dense() {
        let enc = encoder(3, false);
        // a: 3, f: 9, g: 27, p: 3, q: 1, then 2 markers
        assert_eq!(enc.max_var(), 3 + 9 + 27 + 3 + 1 + 2);
        let a = FunctionId::from_index(0);
        assert_eq!(enc.function_literal(a, &[], 1, true).var(), 1);
        assert_eq!(enc.function_literal(a, &[], 3, true).var(), 3);
        let f = FunctionId::from_index(1);
        assert_eq!(enc.function_literal(f, &[1], 1, true).var(), 4);
        // first position least significant
        assert_eq!(enc.function_literal(f, &[2], 1, true).var(), 5);
        assert_eq!(enc.function_literal(f, &[1], 2, true).var(), 7);
        let q = PredicateId::from_index(2);
        assert_eq!(enc.predicate_literal(q, &[], true).var(), 3 + 9 + 27 + 3 + 1);
        assert_eq!(enc.totality_marker(0, true).var(), enc.max_var() - 1);
        assert_eq!(enc.instances_marker(0, false), SatLiteral::negative(enc.max_var()));
    }

    #[test]
    fn test_decode_inverts_literal() {
        let enc = encoder(3, false);
        let g = FunctionId::from_index(2);
        let lit = enc.function_literal(g, &[3, 1], 2, true);
        assert_eq!(
            enc.decode(lit.var()),
            Some(Decoded::Atom(Symbol::Function(g), vec![3, 1, 2]))
        );
        assert_eq!(enc.decode(enc.max_var()), Some(Decoded::InstancesMarker(0)));
        assert_eq!(enc.decode(0), None);
        assert_eq!(enc.decode(enc.max_var() + 1), None);
    }

    #[test]
    fn test_dead_symbols_take_no_space() {
        let enc = VariableEncoder::new(&signature(), &[true, false, false], &[true, true, false], &[2], false, 1000)
            .unwrap();
        // a: 2, p: 2, markers: 2
        assert_eq!(enc.max_var(), 6);
        assert!(!enc.is_encoded(Symbol::Function(FunctionId::from_index(1))));
        assert!(enc.is_encoded(Symbol::Predicate(PredicateId::from_index(1))));
        assert!(!enc.is_encoded(Symbol::Predicate(PredicateId::EQUALITY)));
    }

    #[test]
    fn test_size_markers() {
        let enc = encoder(2, true);
        let base = 2 + 4 + 8 + 2 + 1;
        assert_eq!(enc.max_var(), base + 2);
        assert_eq!(enc.size_marker(0, 0, true).var(), base + 1);
        assert_eq!(enc.decode(base + 2), Some(Decoded::SizeMarker(0, 1)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let result = VariableEncoder::new(&signature(), &[true; 3], &[true; 3], &[5000], false, u32::MAX >> 2);
        assert!(matches!(result, Err(EncodingError::Overflow { .. })));
        let small = VariableEncoder::new(&signature(), &[true; 3], &[true; 3], &[3], false, 20);
        assert!(small.is_err());
    }
}
