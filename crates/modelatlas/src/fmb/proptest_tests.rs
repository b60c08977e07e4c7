//! Property-based tests for the variable layout and tuple enumeration.

use super::axioms::AxiomGenerator;
use super::encoder::{Decoded, Symbol, VariableEncoder};
use super::odometer::Odometer;
use super::symmetry::{widget_orders, SymbolRanking};
use crate::config::{SymbolOrder, WidgetOrder};
use crate::logic::{FunctionId, PredicateId};
use crate::problem::SortedSignature;
use crate::sat::{BatsatOracle, ClauseBuffer, SatLiteral, SatOracle, SatStatus};
use crate::search::{DomainSizeSearch, Nogood, NogoodQueueSearch, SizeOrdering};
use proptest::prelude::*;
use std::collections::HashSet;

/// Signature with two distinct sorts; each symbol draws its positions from them
fn two_sort_signature(functions: &[Vec<usize>], predicates: &[Vec<usize>]) -> SortedSignature {
    let mut predicate_signatures = vec![Vec::new()];
    predicate_signatures.extend(predicates.iter().cloned());
    SortedSignature {
        sorts: 2,
        distinct_sorts: 2,
        parents: vec![0, 1],
        sort_bounds: vec![u32::MAX, u32::MAX],
        monotonic_sorts: vec![false, false],
        function_signatures: functions.to_vec(),
        predicate_signatures,
        sorted_constants: vec![Vec::new(), Vec::new()],
        sorted_functions: vec![Vec::new(), Vec::new()],
        var_eq_sorts: vec![0, 1],
    }
}

/// Flat literal over the variables X0, X1, X2 of a signature with
/// constants a, b and a unary f
#[derive(Debug, Clone)]
enum FlatLiteral {
    /// `c = X` for constant `c`
    Constant(usize, usize, bool),
    /// `f(X) = Y`
    Apply(usize, usize, bool),
    /// `X = Y`
    Equal(usize, usize, bool),
}

fn arb_flat_literal() -> impl Strategy<Value = FlatLiteral> {
    prop_oneof![
        (0..2usize, 0..3usize, any::<bool>()).prop_map(|(c, x, pol)| FlatLiteral::Constant(c, x, pol)),
        (0..3usize, 0..3usize, any::<bool>()).prop_map(|(x, y, pol)| FlatLiteral::Apply(x, y, pol)),
        (0..3usize, 0..3usize, any::<bool>()).prop_map(|(x, y, pol)| FlatLiteral::Equal(x, y, pol)),
    ]
}

/// Ground every clause over all variable assignments and solve at `size`
fn solve_flat(clauses: &[Vec<FlatLiteral>], size: u32, size_markers: bool, symmetry: bool) -> SatStatus {
    let sig = SortedSignature::single_sort(&[0, 0, 1], &[2]);
    let live = [true; 3];
    let enc = VariableEncoder::new(&sig, &live, &[true, false], &[size], size_markers, 1 << 20).unwrap();
    let gen = AxiomGenerator {
        signature: &sig,
        encoder: &enc,
        distinct_sizes: &[size],
        size_markers,
    };
    let f = FunctionId::from_index(2);
    let mut out = ClauseBuffer::new();
    for index in 0..3 {
        gen.definedness(FunctionId::from_index(index), &mut out);
        gen.totality(FunctionId::from_index(index), &mut out);
    }
    if size_markers {
        gen.size_marker_chain(&mut out);
    }
    if symmetry {
        let ranking = SymbolRanking::new(&sig, &live, &[0; 3], SymbolOrder::Occurrence);
        let widgets = widget_orders(&sig, &ranking, &[size], WidgetOrder::ArgumentFirst);
        gen.symmetry(&widgets, 1.0, &mut out);
    }

    let mut odometer = Odometer::new(vec![size; 3]);
    while let Some(values) = odometer.next_tuple() {
        for clause in clauses {
            let mut literals = Vec::new();
            let mut satisfied = false;
            for literal in clause {
                match *literal {
                    FlatLiteral::Constant(c, x, pol) => literals.push(enc.function_literal(
                        FunctionId::from_index(c),
                        &[],
                        values[x],
                        pol,
                    )),
                    FlatLiteral::Apply(x, y, pol) => {
                        literals.push(enc.function_literal(f, &[values[x]], values[y], pol))
                    }
                    FlatLiteral::Equal(x, y, pol) => satisfied |= (values[x] == values[y]) == pol,
                }
            }
            if !satisfied {
                out.add(literals);
            }
        }
    }

    let assumption: SatLiteral = if size_markers {
        enc.size_marker(0, size - 1, false)
    } else {
        enc.totality_marker(0, true)
    };
    let mut oracle = BatsatOracle::new();
    oracle.ensure_var_count(enc.max_var()).unwrap();
    out.submit(&mut oracle).unwrap();
    oracle.solve_under_assumptions(&[assumption])
}

fn arb_symbol_sorts(max_len: usize) -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..2usize, 0..=max_len)
}

proptest! {
    /// Every grounding of every symbol gets its own variable, and decoding
    /// gives the symbol and grounding back
    #[test]
    fn encoder_is_injective_and_decodes(
        functions in proptest::collection::vec(arb_symbol_sorts(2).prop_map(|mut s| { s.push(0); s }), 0..4),
        predicates in proptest::collection::vec(arb_symbol_sorts(3), 0..4),
        sizes in proptest::collection::vec(1..4u32, 2),
        per_size in any::<bool>(),
    ) {
        let sig = two_sort_signature(&functions, &predicates);
        let live_f = vec![true; functions.len()];
        let live_p = vec![true; predicates.len() + 1];
        let enc = VariableEncoder::new(&sig, &live_f, &live_p, &sizes, per_size, 1 << 24).unwrap();

        let mut seen = HashSet::new();
        let mut check = |symbol: Symbol, sorts: &[usize]| -> Result<(), TestCaseError> {
            let bounds = sorts.iter().map(|&s| sizes[s]).collect();
            let mut odometer = Odometer::new(bounds);
            while let Some(grounding) = odometer.next_tuple() {
                let lit = enc.literal(symbol, grounding, true);
                prop_assert!(lit.var() >= 1 && lit.var() <= enc.max_var());
                prop_assert!(seen.insert(lit.var()), "variable {} used twice", lit.var());
                prop_assert_eq!(enc.decode(lit.var()), Some(Decoded::Atom(symbol, grounding.to_vec())));
            }
            Ok(())
        };
        for (f, sorts) in functions.iter().enumerate() {
            check(Symbol::Function(FunctionId::from_index(f)), sorts)?;
        }
        for (p, sorts) in predicates.iter().enumerate() {
            check(Symbol::Predicate(PredicateId::from_index(p + 1)), sorts)?;
        }

        // markers come after the symbol blocks and decode to themselves
        if per_size {
            for (d, &size) in sizes.iter().enumerate() {
                for j in 0..size {
                    let lit = enc.size_marker(d, j, true);
                    prop_assert!(seen.insert(lit.var()));
                    prop_assert_eq!(enc.decode(lit.var()), Some(Decoded::SizeMarker(d, j)));
                }
            }
        } else {
            for d in 0..sizes.len() {
                let t = enc.totality_marker(d, true);
                let i = enc.instances_marker(d, true);
                prop_assert!(seen.insert(t.var()) && seen.insert(i.var()));
                prop_assert_eq!(enc.decode(t.var()), Some(Decoded::TotalityMarker(d)));
                prop_assert_eq!(enc.decode(i.var()), Some(Decoded::InstancesMarker(d)));
            }
        }
        // the layout is dense
        prop_assert_eq!(seen.len() as u32, enc.max_var());
    }

    /// The odometer visits each tuple once, in increasing lexicographic order
    #[test]
    fn odometer_enumerates_every_tuple(bounds in proptest::collection::vec(0..4u32, 0..4)) {
        let mut odometer = Odometer::new(bounds.clone());
        let mut tuples: Vec<Vec<u32>> = Vec::new();
        while let Some(tuple) = odometer.next_tuple() {
            prop_assert!(tuple.iter().zip(&bounds).all(|(&g, &b)| g >= 1 && g <= b));
            tuples.push(tuple.to_vec());
        }
        prop_assert_eq!(tuples.len() as u64, Odometer::count(&bounds));
        prop_assert!(tuples.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(odometer.next_tuple().is_none());
    }

    /// Whatever the weights, the nogood queue never proposes a vector twice
    /// and never proposes one below the start
    #[test]
    fn nogood_queue_never_repeats(
        weights in proptest::collection::vec(0..50u64, 1..15),
        maxima in proptest::collection::vec(1..5u32, 1..4),
    ) {
        let start = vec![1; maxima.len()];
        let mut search = NogoodQueueSearch::new(false);
        search.init(1, &start, &SizeOrdering::default()).unwrap();
        let mut current = start.clone();
        let mut seen = HashSet::new();
        seen.insert(current.clone());
        for weight in weights {
            search.learn_nogood(Nogood::exact(&current), weight);
            match search.propose_next(&current, &maxima).unwrap() {
                Some(next) => {
                    prop_assert!(next.iter().zip(&maxima).all(|(n, m)| n <= m));
                    prop_assert!(next.iter().all(|&n| n >= 1));
                    prop_assert!(seen.insert(next.clone()), "{:?} proposed twice", next);
                    current = next;
                }
                None => break,
            }
        }
    }

    /// Symmetry breaking never changes satisfiability of a problem that
    /// is closed under renaming elements
    #[test]
    fn symmetry_breaking_keeps_satisfiability(
        clauses in proptest::collection::vec(proptest::collection::vec(arb_flat_literal(), 1..4), 1..5),
        size in 1..=3u32,
        size_markers in any::<bool>(),
    ) {
        prop_assert_eq!(
            solve_flat(&clauses, size, size_markers, true),
            solve_flat(&clauses, size, size_markers, false)
        );
    }
}
