//! Code for building the unit commitment and dispatch optimisation model.
//!
//! The model is a MILP minimising thermal generation costs, unit commitment costs, load shedding
//! and spill penalties and reserve costs, subject to network, reservoir, hydro production and
//! unit commitment constraints. It is built fresh from [`CaseData`] for every solve.
use crate::case::{CaseData, SeriesMap, TimeStep};
use crate::id::{BusID, GeneratorID, IDLike, LineID, ReservoirID};
use crate::solver::{Problem, Solution, SolverName, Variable};
use anyhow::{Context, Result, bail, ensure};
use highs::HighsModelStatus;
use indexmap::IndexMap;
use itertools::iproduct;
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;

pub mod commitment;
pub mod hydro;
pub mod network;

/// Variables of one kind, with one variable per entity and time step.
///
/// The entries are ordered (see [`IndexMap`]): entities in the order they appear in the case file
/// and, for each entity, time steps in ascending order.
#[derive(Debug)]
pub struct VariableFamily<ID> {
    name: &'static str,
    vars: IndexMap<(ID, TimeStep), Variable>,
}

impl<ID: IDLike> VariableFamily<ID> {
    /// Create a new, empty [`VariableFamily`]
    fn new(name: &'static str) -> Self {
        Self {
            name,
            vars: IndexMap::new(),
        }
    }

    /// Add a variable for the given entity and time step
    fn insert(&mut self, id: &ID, t: TimeStep, var: Variable) -> Result<()> {
        if self.vars.insert((id.clone(), t), var).is_some() {
            bail!("Duplicate {} variable for {id} at t={t}", self.name);
        }

        Ok(())
    }

    /// The name of the variable family, as used in results
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the variable for the given entity and time step
    pub fn get(&self, id: &ID, t: TimeStep) -> Result<Variable> {
        self.vars
            .get(&(id.clone(), t))
            .copied()
            .with_context(|| format!("No {} variable for {id} at t={t}", self.name))
    }

    /// Iterate over the entity, time step and variable for every entry
    pub fn iter(&self) -> impl Iterator<Item = (&ID, TimeStep, Variable)> {
        self.vars.iter().map(|((id, t), var)| (id, *t, *var))
    }

    /// Number of variables in the family
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the family has no variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// All the decision variables of the model
#[derive(Debug)]
pub struct VariableMap {
    /// Generator output, `P[g,t]`
    pub generation: VariableFamily<GeneratorID>,
    /// Bus voltage angle, `Theta[b,t]`
    pub angle: VariableFamily<BusID>,
    /// Line flow, `F[l,t]`
    pub flow: VariableFamily<LineID>,
    /// Unserved demand, `LS[b,t]`
    pub load_shed: VariableFamily<BusID>,
    /// Reservoir volume at the end of the time step, `V[r,t]`
    pub volume: VariableFamily<ReservoirID>,
    /// Turbined flow, `Q_t[r,t]`
    pub turbined: VariableFamily<ReservoirID>,
    /// Spilled flow, `Q_s[r,t]`
    pub spill: VariableFamily<ReservoirID>,
    /// Aggregate hydro power of a reservoir's units, `P_h[r,t]`
    pub hydro_power: VariableFamily<ReservoirID>,
    /// Whether a thermal unit is online, `u[g,t]`
    pub status: VariableFamily<GeneratorID>,
    /// Whether a thermal unit starts up, `y[g,t]`
    pub startup: VariableFamily<GeneratorID>,
    /// Whether a thermal unit shuts down, `z[g,t]`
    pub shutdown: VariableFamily<GeneratorID>,
    /// Reserve held by a thermal unit, `R[g,t]`
    pub reserve: VariableFamily<GeneratorID>,
}

impl VariableMap {
    fn new() -> Self {
        Self {
            generation: VariableFamily::new("P"),
            angle: VariableFamily::new("Theta"),
            flow: VariableFamily::new("F"),
            load_shed: VariableFamily::new("LS"),
            volume: VariableFamily::new("V"),
            turbined: VariableFamily::new("Q_t"),
            spill: VariableFamily::new("Q_s"),
            hydro_power: VariableFamily::new("P_h"),
            status: VariableFamily::new("u"),
            startup: VariableFamily::new("y"),
            shutdown: VariableFamily::new("z"),
            reserve: VariableFamily::new("R"),
        }
    }
}

/// An optimisation model which has been built but not yet solved
pub struct Model {
    problem: Problem,
    variables: VariableMap,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("num_columns", &self.num_columns())
            .field("num_binaries", &self.num_binaries())
            .field("num_rows", &self.num_rows())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// The model's variables
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// Number of columns (including auxiliary columns for the hydro production functions)
    pub fn num_columns(&self) -> usize {
        self.problem.num_columns()
    }

    /// Number of binary columns
    pub fn num_binaries(&self) -> usize {
        self.problem.num_binaries()
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.problem.num_rows()
    }

    /// Solve the model, blocking until the solver returns
    pub fn solve(self, solver: SolverName) -> Result<SolvedModel> {
        let solution = self.problem.solve(solver)?;
        Ok(SolvedModel {
            variables: self.variables,
            solution,
        })
    }
}

/// A model together with the values returned by the solver.
///
/// This is read-only: values can be looked up but the model can no longer be changed.
#[derive(Debug)]
pub struct SolvedModel {
    variables: VariableMap,
    solution: Solution,
}

impl SolvedModel {
    /// The model's variables
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// The value of the given variable in the solution
    pub fn value(&self, var: Variable) -> f64 {
        self.solution.value(var)
    }

    /// The objective value
    pub fn objective(&self) -> f64 {
        self.solution.objective()
    }

    /// The model status reported by the solver
    pub fn status(&self) -> HighsModelStatus {
        self.solution.status()
    }
}

/// Look up a parameter for an entity
pub(crate) fn get_param<'a, ID: IDLike, T>(
    map: &'a IndexMap<ID, T>,
    id: &ID,
    name: &str,
) -> Result<&'a T> {
    map.get(id)
        .with_context(|| format!("Missing {name} for {id}"))
}

/// Look up a time series for an entity, checking it covers the whole horizon
pub(crate) fn get_series<'a, ID: IDLike>(
    map: &'a SeriesMap<ID>,
    id: &ID,
    name: &str,
    horizon: TimeStep,
) -> Result<&'a [f64]> {
    let series = get_param(map, id, name)?;
    ensure!(
        series.len() == horizon as usize,
        "{name} series for {id} has {} entries, expected {horizon}",
        series.len()
    );

    Ok(series)
}

/// The entry of a 0-indexed series for time step `t`
pub(crate) fn at(series: &[f64], t: TimeStep) -> f64 {
    series[(t - 1) as usize]
}

/// Build the optimisation model for a case.
///
/// Inconsistent data (e.g. a generator connected to an unknown bus or a missing parameter) is
/// reported as an error naming the offending entity.
pub fn build_model(case: &CaseData) -> Result<Model> {
    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, case)?;

    let families: [(&str, ConstraintAdder); 13] = [
        ("hydro generation limits", hydro::add_hydro_generation_limits),
        ("thermal generation limits", commitment::add_thermal_generation_limits),
        ("hydro ramp limits", hydro::add_hydro_ramp_constraints),
        ("thermal ramp limits", commitment::add_thermal_ramp_constraints),
        ("commitment logic", commitment::add_commitment_logic),
        ("DC power flow", network::add_dc_flow_constraints),
        ("angle reference", network::add_reference_angle_constraints),
        ("nodal balance", network::add_nodal_balance_constraints),
        ("reservoir balance", hydro::add_reservoir_constraints),
        ("hydro production", hydro::add_hydro_production_constraints),
        ("minimum up/down time", commitment::add_min_up_down_constraints),
        ("initial status", commitment::add_initial_status_constraints),
        ("reserves", commitment::add_reserve_constraints),
    ];
    for (name, add_constraints) in families {
        let offset = problem.num_rows();
        add_constraints(&mut problem, &variables, case)?;
        debug!("Added {} rows for {name}", problem.num_rows() - offset);
    }

    info!(
        "Built model with {} columns ({} binary) and {} rows",
        problem.num_columns(),
        problem.num_binaries(),
        problem.num_rows()
    );

    Ok(Model { problem, variables })
}

/// Signature shared by the functions adding each family of constraints
type ConstraintAdder = fn(&mut Problem, &VariableMap, &CaseData) -> Result<()>;

/// Add the decision variables, with their objective coefficients, to the problem
fn add_variables(problem: &mut Problem, case: &CaseData) -> Result<VariableMap> {
    let sets = &case.sets;
    let params = &case.params;
    let thermal: HashSet<&GeneratorID> = sets.thermal_generators.iter().collect();
    let mut variables = VariableMap::new();

    for (g, t) in iproduct!(&sets.generators, case.time_steps()) {
        let cost = if thermal.contains(g) {
            *get_param(&params.therm_cost, g, "therm_cost")?
        } else {
            0.0
        };
        variables
            .generation
            .insert(g, t, problem.add_continuous(cost, 0.0..))?;
    }

    for (b, t) in iproduct!(&sets.buses, case.time_steps()) {
        variables.angle.insert(b, t, problem.add_continuous(0.0, ..))?;
    }

    for (line, t) in iproduct!(&sets.lines, case.time_steps()) {
        variables
            .flow
            .insert(&line.name, t, problem.add_continuous(0.0, ..))?;
    }

    for (b, t) in iproduct!(&sets.buses, case.time_steps()) {
        let var = problem.add_continuous(params.penalties.load_shed, 0.0..);
        variables.load_shed.insert(b, t, var)?;
    }

    for (r, t) in iproduct!(&sets.reservoirs, case.time_steps()) {
        variables
            .volume
            .insert(r, t, problem.add_continuous(0.0, 0.0..))?;
        variables
            .turbined
            .insert(r, t, problem.add_continuous(0.0, 0.0..))?;
        let spill = problem.add_continuous(params.penalties.spill, 0.0..);
        variables.spill.insert(r, t, spill)?;
        variables
            .hydro_power
            .insert(r, t, problem.add_continuous(0.0, 0.0..))?;
    }

    for g in &sets.thermal_generators {
        let unit = params.uc.for_generator(g);
        let reserve_cost = params.reserves.cost.get(g).copied().unwrap_or(0.0);
        for t in case.time_steps() {
            variables
                .status
                .insert(g, t, problem.add_binary(unit.no_load_cost))?;
            variables
                .startup
                .insert(g, t, problem.add_binary(unit.startup_cost))?;
            variables
                .shutdown
                .insert(g, t, problem.add_binary(unit.shutdown_cost))?;
            variables
                .reserve
                .insert(g, t, problem.add_continuous(reserve_cost, 0.0..))?;
        }
    }

    Ok(variables)
}
