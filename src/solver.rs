//! A thin layer over the HiGHS solver.
//!
//! The model builder only needs to register columns (with their objective coefficients) and rows,
//! then solve and read the column values back. Everything HiGHS-specific lives here.
use anyhow::{Context, Result, anyhow};
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;
use log::{debug, log_enabled, warn};
use std::fmt;
use std::ops::RangeBounds;
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Clone, Copy)]
pub struct Variable {
    col: highs::Col,
    index: usize,
}

impl Variable {
    /// The position of the column in the problem
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({})", self.index)
    }
}

/// The solvers which can be used for a case.
///
/// All of these are HiGHS: `highs` solves the full MILP, while `simplex` and `ipm` solve the LP
/// relaxation (integrality is ignored) with the given algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SolverName {
    /// HiGHS picks the algorithm; integer columns are respected
    #[default]
    Highs,
    /// LP relaxation with the simplex method
    Simplex,
    /// LP relaxation with the interior point method
    Ipm,
}

impl SolverName {
    /// Parse a solver name as given by the user
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(&name.to_lowercase()).map_err(|_| anyhow!("Unknown solver: {name}"))
    }

    /// Value for the HiGHS `solver` option
    fn highs_option(self) -> &'static str {
        match self {
            Self::Highs => "choose",
            Self::Simplex => "simplex",
            Self::Ipm => "ipm",
        }
    }
}

/// An optimisation problem under construction
#[derive(Default)]
pub struct Problem {
    inner: RowProblem,
    costs: Vec<f64>,
    num_binaries: usize,
    num_rows: usize,
}

impl Problem {
    /// Add a continuous column with the given objective coefficient and bounds
    pub fn add_continuous<B: RangeBounds<f64>>(&mut self, cost: f64, bounds: B) -> Variable {
        let col = self.inner.add_column(cost, bounds);
        self.register(col, cost)
    }

    /// Add a binary column with the given objective coefficient
    pub fn add_binary(&mut self, cost: f64) -> Variable {
        let col = self.inner.add_integer_column(cost, 0.0..=1.0);
        self.num_binaries += 1;
        self.register(col, cost)
    }

    fn register(&mut self, col: highs::Col, cost: f64) -> Variable {
        let index = self.costs.len();
        self.costs.push(cost);
        Variable { col, index }
    }

    /// Add a row, i.e. `bounds` contains the sum of `coeff * var` over `terms`.
    ///
    /// Repeated variables are merged into a single term.
    pub fn add_row<B, I>(&mut self, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let mut merged: IndexMap<usize, (highs::Col, f64)> = IndexMap::new();
        for (var, coeff) in terms {
            merged
                .entry(var.index)
                .and_modify(|(_, total)| *total += coeff)
                .or_insert((var.col, coeff));
        }

        self.inner.add_row(bounds, merged.into_values());
        self.num_rows += 1;
    }

    /// Number of columns added so far
    pub fn num_columns(&self) -> usize {
        self.costs.len()
    }

    /// Number of binary columns added so far
    pub fn num_binaries(&self) -> usize {
        self.num_binaries
    }

    /// Number of rows added so far
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Minimise the objective with the given solver.
    ///
    /// This blocks until HiGHS returns. An error is only returned if HiGHS fails to run; the model
    /// status (optimal, infeasible, etc.) is reported in the [`Solution`] rather than checked here.
    pub fn solve(self, solver: SolverName) -> Result<Solution> {
        let Self { inner, costs, .. } = self;
        let mut model = inner.optimise(Sense::Minimise);
        model.set_option("solver", solver.highs_option());

        // HiGHS writes to stdout directly, so only let it do so when debugging
        let verbose = log_enabled!(log::Level::Debug);
        model.set_option("output_flag", verbose);
        model.set_option("log_to_console", verbose);

        debug!("Solving with {solver} ({} columns)", costs.len());
        let solved = model
            .try_solve()
            .map_err(|status| anyhow!("{status:?}"))
            .context("Solver failed to run")?;

        let status = solved.status();
        if status != HighsModelStatus::Optimal {
            warn!("Solver finished with status {status:?}; values may not be meaningful");
        }

        let columns = solved.get_solution().columns().to_vec();
        let objective = costs.iter().zip(&columns).map(|(cost, value)| cost * value).sum();

        Ok(Solution {
            columns,
            objective,
            status,
        })
    }
}

/// The values returned by the solver
#[derive(Debug)]
pub struct Solution {
    columns: Vec<f64>,
    objective: f64,
    status: HighsModelStatus,
}

impl Solution {
    /// The value of the given variable.
    ///
    /// If the solver did not return a value for the column (e.g. the model was not solved), this
    /// is NaN.
    pub fn value(&self, var: Variable) -> f64 {
        self.columns.get(var.index).copied().unwrap_or(f64::NAN)
    }

    /// The objective value
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// The model status reported by the solver
    pub fn status(&self) -> HighsModelStatus {
        self.status
    }
}
