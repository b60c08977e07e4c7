//! Ranking of grounded terms ("widgets") per sort for symmetry breaking

use crate::config::{SymbolOrder, WidgetOrder};
use crate::logic::{FunctionId, Interner};
use crate::problem::SortedSignature;
use std::fmt;

/// A function applied to concrete domain elements; constants have an empty grounding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroundedTerm {
    pub function: FunctionId,
    pub grounding: Vec<u32>,
}

impl GroundedTerm {
    pub fn constant(function: FunctionId) -> Self {
        GroundedTerm {
            function,
            grounding: Vec::new(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.grounding.is_empty()
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> GroundedTermDisplay<'a> {
        GroundedTermDisplay {
            term: self,
            interner,
        }
    }
}

pub struct GroundedTermDisplay<'a> {
    term: &'a GroundedTerm,
    interner: &'a Interner,
}

impl<'a> fmt::Display for GroundedTermDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interner.resolve_function(self.term.function))?;
        if !self.term.grounding.is_empty() {
            let args: Vec<String> = self.term.grounding.iter().map(|g| g.to_string()).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

/// Constants and non-constant functions of each sort in widget order.
///
/// Computed once per run; only symbols with SAT variables are kept.
#[derive(Debug, Clone)]
pub struct SymbolRanking {
    constants: Vec<Vec<FunctionId>>,
    functions: Vec<Vec<FunctionId>>,
}

impl SymbolRanking {
    /// `usage[f]` is the occurrence count used by the usage-based orders
    pub fn new(
        signature: &SortedSignature,
        live_functions: &[bool],
        usage: &[u32],
        order: SymbolOrder,
    ) -> Self {
        let rank = |symbols: &[FunctionId]| {
            let mut ranked: Vec<FunctionId> = symbols
                .iter()
                .copied()
                .filter(|f| live_functions.get(f.index()).copied().unwrap_or(false))
                .collect();
            if order != SymbolOrder::Occurrence {
                // stable: ties keep occurrence order
                ranked.sort_by_key(|f| std::cmp::Reverse(usage.get(f.index()).copied().unwrap_or(0)));
            }
            ranked
        };
        SymbolRanking {
            constants: signature.sorted_constants.iter().map(|c| rank(c)).collect(),
            functions: signature.sorted_functions.iter().map(|f| rank(f)).collect(),
        }
    }

    pub fn constants(&self, sort: usize) -> &[FunctionId] {
        self.constants.get(sort).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn functions(&self, sort: usize) -> &[FunctionId] {
        self.functions.get(sort).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Widgets of every sort under the current sizes.
///
/// Constants come first. Function widgets are only added for sorts whose
/// bound admits the full current size, and a widget is dropped when one
/// of its argument values exceeds that position's bound.
pub fn widget_orders(
    signature: &SortedSignature,
    ranking: &SymbolRanking,
    distinct_sizes: &[u32],
    order: WidgetOrder,
) -> Vec<Vec<GroundedTerm>> {
    let sort_sizes = signature.sort_sizes(distinct_sizes);
    (0..signature.sorts)
        .map(|sort| {
            let size = sort_sizes[sort];
            let mut widgets: Vec<GroundedTerm> = ranking
                .constants(sort)
                .iter()
                .map(|&c| GroundedTerm::constant(c))
                .collect();
            if signature.bound(sort) < size {
                return widgets;
            }

            let functions = ranking.functions(sort);
            let mut push = |f: FunctionId, value: u32| {
                if let Some(grounding) = uniform_grounding(signature, &sort_sizes, f, value) {
                    widgets.push(GroundedTerm {
                        function: f,
                        grounding,
                    });
                }
            };
            match order {
                WidgetOrder::FunctionFirst => {
                    for &f in functions {
                        for m in 1..=size {
                            push(f, m);
                        }
                    }
                }
                WidgetOrder::ArgumentFirst => {
                    for m in 1..=size {
                        for &f in functions {
                            push(f, m);
                        }
                    }
                }
                WidgetOrder::Diagonal => {
                    for m in 1..=size {
                        for (index, &f) in functions.iter().enumerate() {
                            push(f, 1 + ((m + index as u32) % size));
                        }
                    }
                }
            }
            widgets
        })
        .collect()
}

/// Every argument set to `value`, capped by the argument sort's size;
/// `None` if a capped value still exceeds the sort's bound
fn uniform_grounding(
    signature: &SortedSignature,
    sort_sizes: &[u32],
    f: FunctionId,
    value: u32,
) -> Option<Vec<u32>> {
    signature
        .arg_sorts(f)
        .iter()
        .map(|&s| {
            let g = value.min(sort_sizes[s]);
            (g <= signature.bound(s)).then_some(g)
        })
        .collect()
}
