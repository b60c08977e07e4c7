//! The round loop of the finite model builder
//!
//! ## Rounds
//!
//! Each round fixes one size per distinct sort and:
//!
//! 1. lays out SAT variables for the live symbols ([`VariableEncoder`])
//! 2. grounds the clauses and adds definedness, symmetry and totality axioms
//! 3. solves under growth-marker assumptions
//!
//! A satisfying assignment is decoded into a [`FiniteModel`]. Otherwise the
//! failed assumptions say which sorts were too small, and the size search
//! proposes the next vector.
//!
//! ## Growth markers
//!
//! With the default encoding every distinct sort has a *totality* marker
//! guarding its totality clauses and an *instances* marker guarding clause
//! instances; a failed totality marker means the sort may need to grow, a
//! failed instances marker alone means growing cannot help. The contour
//! encoding instead has one marker per candidate element, which lets a
//! single round cover every smaller size as well.

use super::axioms::{estimate_functional_def_count, AxiomGenerator};
use super::encoder::{Decoded, VariableEncoder};
use super::extract::ModelExtractor;
use super::grounder::{clause_variable_sorts, estimate_instance_count, Grounder};
use super::symmetry::{widget_orders, SymbolRanking};
use crate::config::{EnumerationStrategy, FmbConfig, SymbolOrder};
use crate::error::{FmbError, OracleError, ProblemError};
use crate::logic::{Formula, FunctionId, PredicateId, Term};
use crate::model::FiniteModel;
use crate::problem::{FlatLiteral, FmbProblem, PredicateDefinition, UNBOUNDED};
use crate::sat::{BatsatOracle, ClauseBuffer, SatLiteral, SatOracle, SatStatus};
use crate::search::{
    ConstraintSign, ConstraintSolverSearch, ContourGrowth, DomainSizeSearch, Nogood, NogoodQueueSearch,
    SizeOrdering,
};
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of [`FiniteModelBuilder::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FmbResult {
    Satisfiable(FiniteModel),
    /// No finite model exists
    Refutation,
    GaveUp(GaveUpReason),
    TimeLimit,
    /// The problem is outside what finite model building can answer
    Inappropriate,
}

impl FmbResult {
    /// SZS status name
    pub fn status(&self) -> &'static str {
        match self {
            FmbResult::Satisfiable(_) => "Satisfiable",
            FmbResult::Refutation => "Unsatisfiable",
            FmbResult::GaveUp(_) => "GaveUp",
            FmbResult::TimeLimit => "Timeout",
            FmbResult::Inappropriate => "Inappropriate",
        }
    }

    pub fn model(&self) -> Option<&FiniteModel> {
        match self {
            FmbResult::Satisfiable(model) => Some(model),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GaveUpReason {
    /// Sizes were exhausted but the search cannot certify that no model exists
    SearchIncomplete,
    /// A round needs more SAT variables than the oracle supports
    CannotRepresent,
    SolverUnknown,
    /// Bounds and ordering constraints leave no size vector to try
    NoFiniteSizeAssignment,
    Cancelled,
}

impl fmt::Display for GaveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GaveUpReason::SearchIncomplete => "size search exhausted without a completeness guarantee",
            GaveUpReason::CannotRepresent => "encoding exceeds the SAT variable range",
            GaveUpReason::SolverUnknown => "SAT solver returned unknown",
            GaveUpReason::NoFiniteSizeAssignment => "no size vector satisfies the bounds",
            GaveUpReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FmbStatistics {
    pub rounds: usize,
    pub sizes_tried: Vec<Vec<u32>>,
    pub clauses_per_round: Vec<usize>,
    /// Largest SAT variable of any round
    pub max_sat_variable: u32,
}

enum RoundOutcome {
    Model(FiniteModel),
    /// Decoded failed assumptions
    Unsat(Vec<Decoded>),
    Unknown,
    CannotRepresent,
}

struct RoundReport {
    outcome: RoundOutcome,
    clauses: usize,
    max_var: u32,
}

enum Step {
    Next(Vec<u32>),
    Stop(FmbResult),
}

/// Finite model builder over a preprocessed problem.
///
/// A fresh oracle of type `O` is created for every round.
pub struct FiniteModelBuilder<O: SatOracle + Default + 'static = BatsatOracle> {
    problem: FmbProblem,
    config: FmbConfig,
    /// Variable sorts of each non-ground clause
    clause_sorts: Vec<Vec<usize>>,
    live_functions: Vec<bool>,
    live_predicates: Vec<bool>,
    ranking: SymbolRanking,
    minima: Vec<u32>,
    maxima: Vec<u32>,
    ordering: SizeOrdering,
    cancel: Arc<AtomicBool>,
    statistics: FmbStatistics,
    _oracle: PhantomData<fn() -> O>,
}

impl FiniteModelBuilder<BatsatOracle> {
    pub fn new(problem: FmbProblem, config: FmbConfig) -> Result<Self, FmbError> {
        Self::with_oracle(problem, config)
    }
}

impl<O: SatOracle + Default + 'static> FiniteModelBuilder<O> {
    pub fn with_oracle(problem: FmbProblem, config: FmbConfig) -> Result<Self, FmbError> {
        config.validate()?;
        check_no_eliminated_symbols(&problem)?;

        let clause_sorts = problem
            .clauses
            .iter()
            .enumerate()
            .map(|(i, clause)| clause_variable_sorts(&problem.signature, clause, i))
            .collect::<Result<Vec<_>, _>>()?;

        let (live_functions, live_predicates) = live_symbols(&problem);
        let usage = match config.symbol_order {
            SymbolOrder::Occurrence => Vec::new(),
            SymbolOrder::Usage => clause_function_usage(&problem),
            SymbolOrder::PreprocessedUsage => problem.function_usage.clone(),
        };
        let ranking = SymbolRanking::new(&problem.signature, &live_functions, &usage, config.symbol_order);

        let minima = distinct_minima(&problem);
        let maxima = distinct_maxima(&problem, config.detect_sort_bounds);
        info!(?minima, maxima = ?display_maxima(&maxima), "distinct sort bounds");

        let ordering = SizeOrdering::new(
            problem.sort_constraints.clone(),
            problem.strict_sort_constraints.clone(),
        );

        Ok(FiniteModelBuilder {
            problem,
            config,
            clause_sorts,
            live_functions,
            live_predicates,
            ranking,
            minima,
            maxima,
            ordering,
            cancel: Arc::new(AtomicBool::new(false)),
            statistics: FmbStatistics::default(),
            _oracle: PhantomData,
        })
    }

    /// Flag that stops the search at the next round boundary once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn statistics(&self) -> &FmbStatistics {
        &self.statistics
    }

    pub fn problem(&self) -> &FmbProblem {
        &self.problem
    }

    /// Largest size each distinct sort may take
    pub fn distinct_maxima(&self) -> &[u32] {
        &self.maxima
    }

    fn is_contour(&self) -> bool {
        self.config.enumeration_strategy == EnumerationStrategy::Contour
    }

    pub fn run(&mut self) -> Result<FmbResult, FmbError> {
        let started = Instant::now();
        if self.problem.contains_empty_clause {
            info!("input contains the empty clause");
            return Ok(FmbResult::Refutation);
        }
        if self.problem.known_infinite_domain {
            info!("preprocessing found a sort that must be infinite");
            return Ok(FmbResult::Inappropriate);
        }

        let mut sizes: Vec<u32> = self
            .minima
            .iter()
            .zip(&self.maxima)
            .map(|(&min, &max)| self.config.start_size.min(max).max(min))
            .collect();
        if sizes.iter().zip(&self.maxima).any(|(s, m)| s > m) || !self.ordering.close(&mut sizes, &self.maxima) {
            info!(?sizes, "no size vector within the sort maxima");
            return Ok(FmbResult::GaveUp(GaveUpReason::NoFiniteSizeAssignment));
        }

        let mut search: Option<Box<dyn DomainSizeSearch>> = match self.config.enumeration_strategy {
            EnumerationStrategy::Contour => None,
            EnumerationStrategy::NogoodPriority => {
                Some(Box::new(NogoodQueueSearch::new(self.config.keep_old_generators)))
            }
            EnumerationStrategy::ConstraintSolver => Some(Box::new(ConstraintSolverSearch::<O>::new())),
        };
        if let Some(search) = search.as_mut() {
            if !search.init(self.config.start_size, &sizes, &self.ordering)? {
                info!("sort ordering constraints are unsatisfiable");
                return Ok(FmbResult::GaveUp(GaveUpReason::NoFiniteSizeAssignment));
            }
        }
        let mut growth = ContourGrowth::new(self.config.size_weight_ratio);

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(FmbResult::GaveUp(GaveUpReason::Cancelled));
            }
            if started.elapsed() >= self.config.time_limit {
                info!(rounds = self.statistics.rounds, "time limit reached");
                return Ok(FmbResult::TimeLimit);
            }

            info!("TRYING {:?}", sizes);
            let report = self.round(&sizes)?;
            self.statistics.rounds += 1;
            self.statistics.sizes_tried.push(sizes.clone());
            self.statistics.clauses_per_round.push(report.clauses);
            self.statistics.max_sat_variable = self.statistics.max_sat_variable.max(report.max_var);

            let failed = match report.outcome {
                RoundOutcome::Model(model) => {
                    info!(sizes = ?model.sizes(), "found a finite model");
                    return Ok(FmbResult::Satisfiable(model));
                }
                RoundOutcome::CannotRepresent => return Ok(FmbResult::GaveUp(GaveUpReason::CannotRepresent)),
                RoundOutcome::Unknown => return Ok(FmbResult::GaveUp(GaveUpReason::SolverUnknown)),
                RoundOutcome::Unsat(failed) => failed,
            };

            let step = match search.as_mut() {
                None => self.grow_contour(&mut growth, &failed, &sizes),
                Some(search) => self.learn_and_propose(search.as_mut(), &failed, &sizes, report.clauses as u64)?,
            };
            match step {
                Step::Next(next) => sizes = next,
                Step::Stop(result) => {
                    info!(status = result.status(), "search finished");
                    return Ok(result);
                }
            }
        }
    }

    fn round(&self, sizes: &[u32]) -> Result<RoundReport, FmbError> {
        let signature = &self.problem.signature;
        let contour = self.is_contour();
        let mut oracle = O::default();

        let encoder = match VariableEncoder::new(
            signature,
            &self.live_functions,
            &self.live_predicates,
            sizes,
            contour,
            oracle.var_max(),
        ) {
            Ok(encoder) => encoder,
            Err(e) => {
                warn!(error = %e, "round cannot be encoded");
                return Ok(RoundReport {
                    outcome: RoundOutcome::CannotRepresent,
                    clauses: 0,
                    max_var: 0,
                });
            }
        };
        oracle.ensure_var_count(encoder.max_var())?;

        let mut buffer = ClauseBuffer::new();
        let grounder = Grounder {
            signature,
            encoder: &encoder,
            distinct_sizes: sizes,
            trivial_predicates: &self.problem.trivial_predicates,
            size_markers: contour,
        };
        for clause in &self.problem.ground_clauses {
            grounder.ground_propositional(clause, &mut buffer);
        }
        let mut instances = 0u64;
        for (clause, sorts) in self.problem.clauses.iter().zip(&self.clause_sorts) {
            instances += grounder.ground_clause(clause, sorts, &mut buffer);
        }

        let axioms = AxiomGenerator {
            signature,
            encoder: &encoder,
            distinct_sizes: sizes,
            size_markers: contour,
        };
        let live: Vec<FunctionId> = self.live_function_ids().collect();
        for &f in &live {
            axioms.definedness(f, &mut buffer);
        }
        let widgets = widget_orders(signature, &self.ranking, sizes, self.config.widget_order);
        axioms.symmetry(&widgets, self.config.symmetry_ratio, &mut buffer);
        for &f in &live {
            axioms.totality(f, &mut buffer);
        }
        if contour {
            axioms.size_marker_chain(&mut buffer);
        }

        debug!(
            instances,
            clauses = buffer.len(),
            tautologies = buffer.tautologies(),
            max_var = encoder.max_var(),
            "round encoded"
        );
        let clauses = buffer.submit(&mut oracle)?;

        let assumptions = self.assumptions(&encoder, sizes);
        let outcome = match oracle.solve_under_assumptions(&assumptions) {
            SatStatus::Satisfiable => {
                let model_sizes = if contour {
                    retracted_sizes(&encoder, &oracle, sizes)
                } else {
                    sizes.to_vec()
                };
                let model = ModelExtractor {
                    problem: &self.problem,
                    encoder: &encoder,
                    oracle: &oracle,
                    live_functions: &self.live_functions,
                    live_predicates: &self.live_predicates,
                    encoded_sizes: sizes,
                    model_sizes: &model_sizes,
                }
                .extract();
                RoundOutcome::Model(model)
            }
            SatStatus::Unsatisfiable => RoundOutcome::Unsat(
                oracle
                    .failed_assumptions()
                    .into_iter()
                    .filter_map(|lit| encoder.decode(lit.var()))
                    .collect(),
            ),
            SatStatus::Unknown => RoundOutcome::Unknown,
        };

        Ok(RoundReport {
            outcome,
            clauses,
            max_var: encoder.max_var(),
        })
    }

    fn live_function_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.live_functions
            .iter()
            .enumerate()
            .filter(|&(_, &live)| live)
            .map(|(f, _)| FunctionId::from_index(f))
    }

    fn assumptions(&self, encoder: &VariableEncoder, sizes: &[u32]) -> Vec<SatLiteral> {
        if self.is_contour() {
            sizes
                .iter()
                .enumerate()
                .map(|(d, &size)| encoder.size_marker(d, size - 1, false))
                .collect()
        } else {
            let distinct = sizes.len();
            let mut assumptions: Vec<SatLiteral> =
                (0..distinct).map(|d| encoder.totality_marker(d, true)).collect();
            assumptions.extend((0..distinct).map(|d| encoder.instances_marker(d, true)));
            assumptions
        }
    }

    /// Grow the cheapest failed sort by one
    fn grow_contour(&self, growth: &mut ContourGrowth, failed: &[Decoded], sizes: &[u32]) -> Step {
        let mut failed_sorts: Vec<usize> = failed
            .iter()
            .filter_map(|marker| match *marker {
                Decoded::SizeMarker(d, _) => Some(d),
                _ => None,
            })
            .collect();
        failed_sorts.sort_unstable();
        failed_sorts.dedup();

        let signature = &self.problem.signature;
        let weight = |candidate: &[u32]| {
            estimate_instance_count(signature, &self.clause_sorts, candidate)
                .saturating_add(estimate_functional_def_count(signature, &self.live_functions, candidate))
        };
        let Some(d) = growth.choose(&failed_sorts, sizes, &self.maxima, weight) else {
            debug!(?failed_sorts, "no failed sort can grow");
            return Step::Stop(FmbResult::Refutation);
        };

        let mut next = sizes.to_vec();
        next[d] += 1;
        debug!(sort = d, size = next[d], "growing sort");
        if !self.ordering.close(&mut next, &self.maxima) {
            debug!(?next, "ordering constraints push past the sort maxima");
            return Step::Stop(FmbResult::GaveUp(GaveUpReason::NoFiniteSizeAssignment));
        }
        Step::Next(next)
    }

    fn learn_and_propose(
        &self,
        search: &mut dyn DomainSizeSearch,
        failed: &[Decoded],
        sizes: &[u32],
        weight: u64,
    ) -> Result<Step, FmbError> {
        let monotonic = &self.problem.signature.monotonic_sorts;
        let mut nogood = Nogood::star(sizes);
        for marker in failed {
            if let Decoded::TotalityMarker(d) = *marker {
                let sign = if monotonic.get(d).copied().unwrap_or(false) {
                    ConstraintSign::Leq
                } else {
                    ConstraintSign::Eq
                };
                nogood.set(d, sign);
            }
        }
        for marker in failed {
            if let Decoded::InstancesMarker(d) = *marker {
                if nogood.sign(d) == ConstraintSign::Star {
                    nogood.set(d, ConstraintSign::Geq);
                }
            }
        }
        debug!(%nogood, weight, "learned nogood");
        search.learn_nogood(nogood, weight);

        let step = match search.propose_next(sizes, &self.maxima) {
            Ok(Some(next)) => Step::Next(next),
            Ok(None) if search.is_complete(sizes.len()) => Step::Stop(FmbResult::Refutation),
            Ok(None) => Step::Stop(FmbResult::GaveUp(GaveUpReason::SearchIncomplete)),
            Err(OracleError::Inconclusive) => Step::Stop(FmbResult::GaveUp(GaveUpReason::SolverUnknown)),
            Err(e) => return Err(e.into()),
        };
        Ok(step)
    }
}

/// Per sort: one more than the first element marker left false
fn retracted_sizes(encoder: &VariableEncoder, oracle: &dyn SatOracle, sizes: &[u32]) -> Vec<u32> {
    sizes
        .iter()
        .enumerate()
        .map(|(d, &size)| {
            (0..size)
                .find(|&j| !oracle.true_in_assignment(encoder.size_marker(d, j, true)))
                .map_or(size, |j| j + 1)
        })
        .collect()
}

fn check_no_eliminated_symbols(problem: &FmbProblem) -> Result<(), ProblemError> {
    let interner = &problem.interner;
    for clause in problem.clauses.iter().chain(&problem.ground_clauses) {
        for lit in &clause.literals {
            match lit {
                FlatLiteral::Function { function, .. } if problem.is_function_deleted(*function) => {
                    return Err(ProblemError::EliminatedSymbolInClause(
                        interner.resolve_function(*function).to_string(),
                    ));
                }
                FlatLiteral::Predicate { predicate, .. } if problem.is_predicate_deleted(*predicate) => {
                    return Err(ProblemError::EliminatedSymbolInClause(
                        interner.resolve_predicate(*predicate).to_string(),
                    ));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Symbols that get SAT variables: used in a clause or in the definition of
/// an eliminated symbol, and not eliminated themselves
fn live_symbols(problem: &FmbProblem) -> (Vec<bool>, Vec<bool>) {
    let signature = &problem.signature;
    let mut functions = vec![false; signature.function_count()];
    let mut predicates = vec![false; signature.predicate_count()];

    for clause in problem.clauses.iter().chain(&problem.ground_clauses) {
        for lit in &clause.literals {
            match lit {
                FlatLiteral::Function { function, .. } => functions[function.index()] = true,
                FlatLiteral::Predicate { predicate, .. } => predicates[predicate.index()] = true,
                FlatLiteral::VarEquality { .. } => {}
            }
        }
    }
    for def in problem.deleted_functions.values() {
        mark_term(&def.body, &mut functions);
    }
    let predicate_defs = problem
        .deleted_predicates
        .values()
        .chain(problem.partially_deleted_predicates.values());
    for def in predicate_defs {
        if let PredicateDefinition::Equivalence { body, .. } = def {
            mark_formula(body, &mut functions, &mut predicates);
        }
    }

    for (f, live) in functions.iter_mut().enumerate() {
        *live &= !problem.is_function_deleted(FunctionId::from_index(f));
    }
    for (p, live) in predicates.iter_mut().enumerate() {
        let id = PredicateId::from_index(p);
        *live &= !id.is_equality()
            && !problem.is_predicate_deleted(id)
            && !problem.trivial_predicates.contains_key(&id);
    }
    (functions, predicates)
}

fn mark_term(term: &Term, functions: &mut [bool]) {
    term.for_each_function(&mut |f| {
        if let Some(slot) = functions.get_mut(f.id.index()) {
            *slot = true;
        }
    });
}

fn mark_formula(formula: &Formula, functions: &mut [bool], predicates: &mut [bool]) {
    match formula {
        Formula::True | Formula::False => {}
        Formula::Atom(lit) => {
            if let Some(slot) = predicates.get_mut(lit.predicate.id.index()) {
                *slot = true;
            }
            for arg in &lit.args {
                mark_term(arg, functions);
            }
        }
        Formula::Not(f) | Formula::Quantified(_, _, _, f) => mark_formula(f, functions, predicates),
        Formula::And(fs) | Formula::Or(fs) => {
            for f in fs {
                mark_formula(f, functions, predicates);
            }
        }
        Formula::Implies(l, r) | Formula::Iff(l, r) => {
            mark_formula(l, functions, predicates);
            mark_formula(r, functions, predicates);
        }
    }
}

/// Function occurrences in the flattened clauses
fn clause_function_usage(problem: &FmbProblem) -> Vec<u32> {
    let mut usage = vec![0u32; problem.signature.function_count()];
    for clause in &problem.clauses {
        for lit in &clause.literals {
            if let FlatLiteral::Function { function, .. } = lit {
                usage[function.index()] += 1;
            }
        }
    }
    usage
}

fn distinct_minima(problem: &FmbProblem) -> Vec<u32> {
    (0..problem.signature.distinct_sorts)
        .map(|d| problem.distinct_sort_mins.get(d).copied().unwrap_or(1).max(1))
        .collect()
}

/// Largest bound among the sorts of each distinct sort. With
/// `detect_bounds`, a distinct sort whose elements can only be named by
/// constants needs no more elements than it has constants.
fn distinct_maxima(problem: &FmbProblem, detect_bounds: bool) -> Vec<u32> {
    let signature = &problem.signature;
    let distinct = signature.distinct_sorts;
    let mut maxima = vec![0u32; distinct];
    let mut has_functions = vec![false; distinct];
    let mut constants = vec![0u32; distinct];
    for sort in 0..signature.sorts {
        let d = signature.parent(sort);
        maxima[d] = maxima[d].max(signature.bound(sort));
        has_functions[d] |= signature
            .sorted_functions
            .get(sort)
            .is_some_and(|fs| !fs.is_empty());
        constants[d] += signature.sorted_constants.get(sort).map_or(0, |cs| cs.len() as u32);
    }
    for (d, max) in maxima.iter_mut().enumerate() {
        if *max == 0 {
            *max = UNBOUNDED;
        }
        if detect_bounds && !has_functions[d] {
            let bound = constants[d].max(1);
            if bound < *max {
                debug!(sort = d, bound, "sort bounded by its constants");
                *max = bound;
            }
        }
    }
    maxima
}

fn display_maxima(maxima: &[u32]) -> Vec<String> {
    maxima
        .iter()
        .map(|&m| if m == UNBOUNDED { "inf".to_string() } else { m.to_string() })
        .collect()
}
