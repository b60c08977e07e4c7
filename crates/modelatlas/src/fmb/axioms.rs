//! Functionality, totality and symmetry-breaking clauses

use super::encoder::VariableEncoder;
use super::odometer::Odometer;
use super::symmetry::GroundedTerm;
use crate::logic::FunctionId;
use crate::problem::SortedSignature;
use crate::sat::{ClauseBuffer, SatLiteral};

pub struct AxiomGenerator<'a> {
    pub signature: &'a SortedSignature,
    pub encoder: &'a VariableEncoder,
    pub distinct_sizes: &'a [u32],
    pub size_markers: bool,
}

impl<'a> AxiomGenerator<'a> {
    fn bounded(&self, sort: usize) -> u32 {
        self.signature.bounded_size(sort, self.distinct_sizes)
    }

    fn arg_bounds(&self, f: FunctionId) -> Vec<u32> {
        self.signature
            .arg_sorts(f)
            .iter()
            .map(|&s| self.bounded(s))
            .collect()
    }

    /// `f(x) != y | f(x) != z` for every `x` and `y < z`
    pub fn definedness(&self, f: FunctionId, out: &mut ClauseBuffer) {
        let ret = self.bounded(self.signature.return_sort(f));
        let mut bounds = vec![ret, ret];
        bounds.extend(self.arg_bounds(f));

        let mut odometer = Odometer::new(bounds);
        while let Some(tuple) = odometer.next_tuple() {
            let (y, z) = (tuple[0], tuple[1]);
            if y >= z {
                continue;
            }
            let args = &tuple[2..];
            out.add(vec![
                self.encoder.function_literal(f, args, y, false),
                self.encoder.function_literal(f, args, z, false),
            ]);
        }
    }

    /// `f(x) = 1 | .. | f(x) = k` guarded by a growth marker.
    ///
    /// With size markers every prefix `1..i` gets its own clause, guarded by
    /// the marker saying the sort needs more than `i` elements; the full
    /// clause is guarded by the last marker. Monotonic return sorts only get
    /// the full clause.
    pub fn totality(&self, f: FunctionId, out: &mut ClauseBuffer) {
        let ret_sort = self.signature.return_sort(f);
        let dret = self.signature.parent(ret_sort);
        let max = self.bounded(ret_sort);
        let first = if self.size_markers && !self.signature.monotonic_sorts[dret] {
            1
        } else {
            max
        };

        let mut odometer = Odometer::new(self.arg_bounds(f));
        while let Some(args) = odometer.next_tuple() {
            for i in first..=max {
                let mut literals: Vec<_> = (1..=i)
                    .map(|value| self.encoder.function_literal(f, args, value, true))
                    .collect();
                if self.size_markers {
                    let index = if i == max {
                        self.distinct_sizes[dret] - 1
                    } else {
                        i - 1
                    };
                    literals.push(self.encoder.size_marker(dret, index, true));
                } else {
                    literals.push(self.encoder.totality_marker(dret, false));
                }
                out.add(literals);
            }
        }
    }

    /// `marker(j + 1) -> marker(j)` for every distinct sort
    pub fn size_marker_chain(&self, out: &mut ClauseBuffer) {
        for (d, &size) in self.distinct_sizes.iter().enumerate() {
            for j in 0..size.saturating_sub(1) {
                out.add(vec![
                    self.encoder.size_marker(d, j, true),
                    self.encoder.size_marker(d, j + 1, false),
                ]);
            }
        }
    }

    /// Restricted totality and canonicity over each sort's widgets.
    ///
    /// Any model can be renamed so that elements are numbered in order of
    /// first appearance along the widget sequence, a function widget's
    /// arguments counting as appearing just before it. Only sorts that are
    /// alone in their distinct sort are renamed, and only widgets whose
    /// arguments live in that same sort take part.
    pub fn symmetry(&self, widgets: &[Vec<GroundedTerm>], ratio: f32, out: &mut ClauseBuffer) {
        for (sort, sort_widgets) in widgets.iter().enumerate() {
            if !self.sole_member(sort) {
                continue;
            }
            let sort_widgets: Vec<&GroundedTerm> = sort_widgets
                .iter()
                .filter(|w| self.signature.arg_sorts(w.function).iter().all(|&s| s == sort))
                .collect();
            let max_size = self.bounded(sort);
            self.restricted_totality(sort, &sort_widgets, max_size, out);
            for size in 2..=max_size {
                self.canonicity(size, &sort_widgets, max_size, ratio, out);
            }
        }
    }

    fn sole_member(&self, sort: usize) -> bool {
        let d = self.signature.parent(sort);
        self.signature.parents.iter().filter(|&&p| p == d).count() == 1
    }

    /// Guard shared with the full totality clause of the sort's domain
    fn totality_guard(&self, sort: usize) -> SatLiteral {
        let d = self.signature.parent(sort);
        if self.size_markers {
            self.encoder.size_marker(d, self.distinct_sizes[d] - 1, true)
        } else {
            self.encoder.totality_marker(d, false)
        }
    }

    /// Each widget takes an element already named or the next fresh one
    fn restricted_totality(&self, sort: usize, widgets: &[&GroundedTerm], max_size: u32, out: &mut ClauseBuffer) {
        let mut named = 0u32;
        for widget in widgets {
            let args_named = widget.grounding.iter().copied().max().unwrap_or(0);
            named = (named.max(args_named) + 1).min(max_size);
            if named == max_size {
                break;
            }
            let mut literals: Vec<SatLiteral> = (1..=named)
                .map(|value| {
                    self.encoder
                        .function_literal(widget.function, &widget.grounding, value, true)
                })
                .collect();
            literals.push(self.totality_guard(sort));
            out.add(literals);
        }
    }

    /// A leading constant may take `size` only if an earlier one takes `size - 1`
    fn canonicity(
        &self,
        size: u32,
        widgets: &[&GroundedTerm],
        max_size: u32,
        ratio: f32,
        out: &mut ClauseBuffer,
    ) {
        let constants = widgets.iter().take_while(|w| w.is_constant()).count();
        let window = ((ratio * max_size as f32) as usize).min(constants);
        for i in 1..window {
            let mut literals = Vec::with_capacity(i + 1);
            literals.push(self.encoder.function_literal(widgets[i].function, &[], size, false));
            for earlier in &widgets[..i] {
                literals.push(self.encoder.function_literal(earlier.function, &[], size - 1, true));
            }
            out.add(literals);
        }
    }
}

/// Number of definedness clauses the live functions produce under `distinct_sizes`
pub fn estimate_functional_def_count(
    signature: &SortedSignature,
    live_functions: &[bool],
    distinct_sizes: &[u32],
) -> u64 {
    let mut total = 0u64;
    for (f, &live) in live_functions.iter().enumerate() {
        if !live {
            continue;
        }
        let f = FunctionId::from_index(f);
        let ret = signature.bounded_size(signature.return_sort(f), distinct_sizes);
        let mut bounds = vec![ret, ret];
        bounds.extend(
            signature
                .arg_sorts(f)
                .iter()
                .map(|&s| signature.bounded_size(s, distinct_sizes)),
        );
        total = total.saturating_add(Odometer::count(&bounds) / 2);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SymbolOrder, WidgetOrder};
    use crate::fmb::symmetry::{widget_orders, SymbolRanking};
    use crate::problem::signature::UNBOUNDED;
    use crate::sat::{BatsatOracle, SatLiteral, SatOracle, SatStatus};

    /// a/0, b/0, c/0, f/1
    fn signature() -> SortedSignature {
        SortedSignature::single_sort(&[0, 0, 0, 1], &[2])
    }

    fn encoder(sig: &SortedSignature, size: u32, size_markers: bool) -> VariableEncoder {
        VariableEncoder::new(sig, &[true; 4], &[true, false], &[size], size_markers, 1 << 20).unwrap()
    }

    fn solve(enc: &VariableEncoder, out: &mut ClauseBuffer, assumptions: &[SatLiteral]) -> (BatsatOracle, SatStatus) {
        let mut oracle = BatsatOracle::new();
        oracle.ensure_var_count(enc.max_var()).unwrap();
        out.submit(&mut oracle).unwrap();
        let status = oracle.solve_under_assumptions(assumptions);
        (oracle, status)
    }

    #[test]
    fn test_definedness_counts() {
        let sig = signature();
        let enc = encoder(&sig, 3, false);
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3],
            size_markers: false,
        };
        let mut out = ClauseBuffer::new();
        gen.definedness(FunctionId::from_index(3), &mut out);
        // 3 arguments, 3 pairs each
        assert_eq!(out.len(), 9);
        assert!(out.iter().all(|c| c.len() == 2 && c.literals().iter().all(|l| !l.polarity())));
        assert_eq!(estimate_functional_def_count(&sig, &[false, false, false, true], &[3]), 13);
    }

    #[test]
    fn test_definedness_and_totality_give_a_function() {
        let sig = signature();
        let enc = encoder(&sig, 3, false);
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3],
            size_markers: false,
        };
        let f = FunctionId::from_index(3);
        let mut out = ClauseBuffer::new();
        gen.definedness(f, &mut out);
        gen.totality(f, &mut out);
        let (oracle, status) = solve(&enc, &mut out, &[enc.totality_marker(0, true)]);
        assert_eq!(status, SatStatus::Satisfiable);
        for x in 1..=3 {
            let values = (1..=3)
                .filter(|&y| oracle.true_in_assignment(enc.function_literal(f, &[x], y, true)))
                .count();
            assert_eq!(values, 1);
        }
    }

    #[test]
    fn test_totality_is_guarded_by_marker() {
        let sig = signature();
        let enc = encoder(&sig, 2, false);
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[2],
            size_markers: false,
        };
        let a = FunctionId::from_index(0);
        let mut out = ClauseBuffer::new();
        gen.totality(a, &mut out);
        out.add(vec![enc.function_literal(a, &[], 1, false)]);
        out.add(vec![enc.function_literal(a, &[], 2, false)]);
        let marker = enc.totality_marker(0, true);
        let (oracle, status) = solve(&enc, &mut out, &[marker]);
        assert_eq!(status, SatStatus::Unsatisfiable);
        assert_eq!(oracle.failed_assumptions(), vec![marker]);
    }

    #[test]
    fn test_size_marker_totality_versions() {
        let sig = signature();
        let enc = encoder(&sig, 3, true);
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3],
            size_markers: true,
        };
        let mut out = ClauseBuffer::new();
        gen.totality(FunctionId::from_index(0), &mut out);
        assert_eq!(out.len(), 3);
        let lens: Vec<usize> = out.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![2, 3, 4]);
        let full = out.iter().last().unwrap();
        assert!(full.literals().contains(&enc.size_marker(0, 2, true)));

        let mut chain = ClauseBuffer::new();
        gen.size_marker_chain(&mut chain);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_symmetry_breaking_keeps_satisfiability() {
        // three distinct constants need three values; symmetry must allow it
        let sig = signature();
        let enc = encoder(&sig, 3, false);
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3],
            size_markers: false,
        };
        let live = [true; 4];
        let ranking = SymbolRanking::new(&sig, &live, &[0; 4], SymbolOrder::Occurrence);
        let widgets = widget_orders(&sig, &ranking, &[3], WidgetOrder::FunctionFirst);

        let mut out = ClauseBuffer::new();
        for f in 0..4 {
            gen.definedness(FunctionId::from_index(f), &mut out);
            gen.totality(FunctionId::from_index(f), &mut out);
        }
        gen.symmetry(&widgets, 1.0, &mut out);
        let consts = [0, 1, 2].map(FunctionId::from_index);
        for i in 0..3 {
            for j in (i + 1)..3 {
                for v in 1..=3 {
                    out.add(vec![
                        enc.function_literal(consts[i], &[], v, false),
                        enc.function_literal(consts[j], &[], v, false),
                    ]);
                }
            }
        }
        let (oracle, status) = solve(&enc, &mut out, &[enc.totality_marker(0, true)]);
        assert_eq!(status, SatStatus::Satisfiable);
        // canonical: a = 1, b = 2, c = 3
        for (i, &c) in consts.iter().enumerate() {
            assert!(oracle.true_in_assignment(enc.function_literal(c, &[], i as u32 + 1, true)));
        }
    }

    /// f/1 with f(x) != x for every x: satisfiable exactly from size 2
    fn fixpoint_free(size: u32, size_markers: bool, symmetry: bool) -> SatStatus {
        let sig = SortedSignature::single_sort(&[1], &[2]);
        let enc = VariableEncoder::new(&sig, &[true], &[true, false], &[size], size_markers, 1 << 20).unwrap();
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[size],
            size_markers,
        };
        let f = FunctionId::from_index(0);
        let mut out = ClauseBuffer::new();
        gen.definedness(f, &mut out);
        gen.totality(f, &mut out);
        if size_markers {
            gen.size_marker_chain(&mut out);
        }
        if symmetry {
            let ranking = SymbolRanking::new(&sig, &[true], &[0], SymbolOrder::Occurrence);
            let widgets = widget_orders(&sig, &ranking, &[size], WidgetOrder::FunctionFirst);
            gen.symmetry(&widgets, 1.0, &mut out);
        }
        for x in 1..=size {
            out.add(vec![enc.function_literal(f, &[x], x, false)]);
        }
        let assumption = if size_markers {
            enc.size_marker(0, size - 1, false)
        } else {
            enc.totality_marker(0, true)
        };
        solve(&enc, &mut out, &[assumption]).1
    }

    #[test]
    fn test_symmetry_keeps_function_widget_models() {
        for size_markers in [false, true] {
            for size in 1..=3 {
                assert_eq!(
                    fixpoint_free(size, size_markers, true),
                    fixpoint_free(size, size_markers, false),
                    "size {size}, size markers {size_markers}"
                );
            }
            assert_eq!(fixpoint_free(2, size_markers, true), SatStatus::Satisfiable);
        }
    }

    #[test]
    fn test_restricted_totality_is_guarded() {
        let sig = SortedSignature::single_sort(&[0, 0], &[2]);
        let enc = VariableEncoder::new(&sig, &[true, true], &[true, false], &[2], false, 1 << 20).unwrap();
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[2],
            size_markers: false,
        };
        let (a, b) = (FunctionId::from_index(0), FunctionId::from_index(1));
        let widgets = vec![vec![GroundedTerm::constant(a), GroundedTerm::constant(b)]];
        let mut out = ClauseBuffer::new();
        gen.definedness(a, &mut out);
        gen.totality(a, &mut out);
        gen.symmetry(&widgets, 1.0, &mut out);
        out.add(vec![enc.function_literal(a, &[], 1, false)]);
        let marker = enc.totality_marker(0, true);
        let (oracle, status) = solve(&enc, &mut out, &[marker]);
        // a = 1 is forbidden, so only the totality marker may be blamed
        assert_eq!(status, SatStatus::Unsatisfiable);
        assert_eq!(oracle.failed_assumptions(), vec![marker]);
    }

    #[test]
    fn test_function_widget_bounds() {
        let sig = SortedSignature::single_sort(&[1], &[2]);
        let enc = VariableEncoder::new(&sig, &[true], &[true, false], &[3], false, 1 << 20).unwrap();
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3],
            size_markers: false,
        };
        let f = FunctionId::from_index(0);
        let widgets = vec![(1..=3)
            .map(|x| GroundedTerm {
                function: f,
                grounding: vec![x],
            })
            .collect::<Vec<_>>()];
        let mut out = ClauseBuffer::new();
        gen.symmetry(&widgets, 1.0, &mut out);
        // f(1) in {1, 2}; f(2) may already reach every element
        assert_eq!(out.len(), 1);
        let clause = out.iter().next().unwrap();
        assert!(clause.literals().contains(&enc.function_literal(f, &[1], 2, true)));
        assert!(!clause.literals().contains(&enc.function_literal(f, &[1], 3, true)));
        assert!(clause.literals().contains(&enc.totality_marker(0, false)));
    }

    #[test]
    fn test_mixed_sort_widgets_are_excluded() {
        // f: s0 -> s1 has arguments outside its own sort
        let mut sig = SortedSignature::single_sort(&[1], &[2]);
        sig.sorts = 2;
        sig.distinct_sorts = 2;
        sig.parents = vec![0, 1];
        sig.sort_bounds = vec![UNBOUNDED; 2];
        sig.monotonic_sorts = vec![false; 2];
        sig.var_eq_sorts = vec![0, 1];
        sig.function_signatures = vec![vec![0, 1]];
        sig.sorted_functions = vec![vec![], vec![FunctionId::from_index(0)]];
        sig.sorted_constants = vec![vec![], vec![]];
        let enc = VariableEncoder::new(&sig, &[true], &[true, false], &[3, 3], false, 1 << 20).unwrap();
        let gen = AxiomGenerator {
            signature: &sig,
            encoder: &enc,
            distinct_sizes: &[3, 3],
            size_markers: false,
        };
        let widgets = vec![
            vec![],
            vec![GroundedTerm {
                function: FunctionId::from_index(0),
                grounding: vec![1],
            }],
        ];
        let mut out = ClauseBuffer::new();
        gen.symmetry(&widgets, 1.0, &mut out);
        assert!(out.is_empty());
    }
}
