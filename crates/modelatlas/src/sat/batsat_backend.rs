//! [`SatOracle`] backed by batsat, a Rust port of MiniSat

use super::{SatClause, SatLiteral, SatOracle, SatStatus};
use crate::error::OracleError;
use batsat::{lbool, BasicSolver, Lit, SolverInterface, Var};
use std::collections::HashSet;

/// Literals are stored as `2 * var + sign`, so ids stay well below `u32::MAX`
const VAR_MAX: u32 = (u32::MAX >> 2) - 1;

pub struct BatsatOracle {
    solver: BasicSolver,
    /// SAT variable `i` lives at `vars[i - 1]`
    vars: Vec<Var>,
    failed: Vec<SatLiteral>,
    scratch: Vec<Lit>,
}

impl Default for BatsatOracle {
    fn default() -> Self {
        BatsatOracle {
            solver: BasicSolver::default(),
            vars: Vec::new(),
            failed: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl BatsatOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lit(&self, literal: SatLiteral) -> Result<Lit, OracleError> {
        let var = self
            .vars
            .get(literal.var() as usize - 1)
            .copied()
            .ok_or(OracleError::UndeclaredVariable(literal.var()))?;
        Ok(Lit::new(var, literal.polarity()))
    }
}

impl SatOracle for BatsatOracle {
    fn var_max(&self) -> u32 {
        VAR_MAX
    }

    fn ensure_var_count(&mut self, count: u32) -> Result<(), OracleError> {
        if count > VAR_MAX {
            return Err(OracleError::TooManyVariables {
                requested: count,
                limit: VAR_MAX,
            });
        }
        while self.vars.len() < count as usize {
            let var = self.solver.new_var_default();
            self.vars.push(var);
        }
        Ok(())
    }

    fn add_clause(&mut self, clause: &SatClause) -> Result<(), OracleError> {
        let mut lits = std::mem::take(&mut self.scratch);
        lits.clear();
        for &literal in clause.literals() {
            lits.push(self.lit(literal)?);
        }
        // false only means the formula is already unsatisfiable
        self.solver.add_clause_reuse(&mut lits);
        self.scratch = lits;
        Ok(())
    }

    fn solve_under_assumptions(&mut self, assumptions: &[SatLiteral]) -> SatStatus {
        self.failed.clear();
        let mut lits = Vec::with_capacity(assumptions.len());
        for &assumption in assumptions {
            match self.lit(assumption) {
                Ok(lit) => lits.push(lit),
                Err(_) => return SatStatus::Unknown,
            }
        }

        let result = self.solver.solve_limited(&lits);
        if result == lbool::TRUE {
            SatStatus::Satisfiable
        } else if result == lbool::FALSE {
            let core: HashSet<Var> = self.solver.unsat_core().iter().map(|l| l.var()).collect();
            self.failed = assumptions
                .iter()
                .zip(&lits)
                .filter(|(_, lit)| core.contains(&lit.var()))
                .map(|(&assumption, _)| assumption)
                .collect();
            SatStatus::Unsatisfiable
        } else {
            SatStatus::Unknown
        }
    }

    fn failed_assumptions(&self) -> Vec<SatLiteral> {
        self.failed.clone()
    }

    fn true_in_assignment(&self, literal: SatLiteral) -> bool {
        match self.lit(literal) {
            Ok(lit) => self.solver.value_lit(lit) == lbool::TRUE,
            Err(_) => false,
        }
    }
}
