//! Load a case, build and solve its model and collect the results.
use crate::case::{CaseData, TimeStep};
use crate::id::{BusID, GeneratorID, IDLike, LineID, ReservoirID};
use crate::input::load_case;
use crate::model::{SolvedModel, VariableFamily, build_model};
use crate::solver::SolverName;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Borrow;
use std::path::Path;

/// The value of one variable family, keyed by entity and time step
pub type ValueMap<ID> = IndexMap<(ID, TimeStep), f64>;

/// The flat results of a solve.
///
/// Every map has exactly one entry per member of the relevant set and time step. The entries are
/// in the same order as the variables were created.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResults {
    /// Objective value
    pub objective: f64,
    /// Model status reported by the solver (e.g. `Optimal`)
    pub status: String,
    /// `P`
    pub generation: ValueMap<GeneratorID>,
    /// `Theta`
    pub angle: ValueMap<BusID>,
    /// `F`
    pub flow: ValueMap<LineID>,
    /// `LS`
    pub load_shed: ValueMap<BusID>,
    /// `V`
    pub volume: ValueMap<ReservoirID>,
    /// `Q_t`
    pub turbined: ValueMap<ReservoirID>,
    /// `Q_s`
    pub spill: ValueMap<ReservoirID>,
    /// `P_h`
    pub hydro_power: ValueMap<ReservoirID>,
    /// `u`
    pub status_on: ValueMap<GeneratorID>,
    /// `y`
    pub startup: ValueMap<GeneratorID>,
    /// `z`
    pub shutdown: ValueMap<GeneratorID>,
    /// `R`
    pub reserve: ValueMap<GeneratorID>,
}

/// One value from [`SolveResults`]: variable family name, entity, time step and value
pub type ResultEntry<'a> = (&'static str, &'a str, TimeStep, f64);

impl SolveResults {
    /// Read the value of every variable from a solved model
    pub fn from_model(model: &SolvedModel) -> Self {
        let vars = model.variables();
        Self {
            objective: model.objective(),
            status: format!("{:?}", model.status()),
            generation: extract(model, &vars.generation),
            angle: extract(model, &vars.angle),
            flow: extract(model, &vars.flow),
            load_shed: extract(model, &vars.load_shed),
            volume: extract(model, &vars.volume),
            turbined: extract(model, &vars.turbined),
            spill: extract(model, &vars.spill),
            hydro_power: extract(model, &vars.hydro_power),
            status_on: extract(model, &vars.status),
            startup: extract(model, &vars.startup),
            shutdown: extract(model, &vars.shutdown),
            reserve: extract(model, &vars.reserve),
        }
    }

    /// Iterate over every value, one family after another.
    ///
    /// Families are visited in the order `P`, `Theta`, `F`, `LS`, `V`, `Q_t`, `Q_s`, `P_h`, `u`,
    /// `y`, `z`, `R`.
    pub fn iter(&self) -> impl Iterator<Item = ResultEntry<'_>> {
        entries("P", &self.generation)
            .chain(entries("Theta", &self.angle))
            .chain(entries("F", &self.flow))
            .chain(entries("LS", &self.load_shed))
            .chain(entries("V", &self.volume))
            .chain(entries("Q_t", &self.turbined))
            .chain(entries("Q_s", &self.spill))
            .chain(entries("P_h", &self.hydro_power))
            .chain(entries("u", &self.status_on))
            .chain(entries("y", &self.startup))
            .chain(entries("z", &self.shutdown))
            .chain(entries("R", &self.reserve))
    }
}

/// Read the values of a variable family
fn extract<ID: IDLike>(model: &SolvedModel, family: &VariableFamily<ID>) -> ValueMap<ID> {
    family
        .iter()
        .map(|(id, t, var)| ((id.clone(), t), model.value(var)))
        .collect()
}

fn entries<'a, ID: IDLike>(
    name: &'static str,
    values: &'a ValueMap<ID>,
) -> impl Iterator<Item = ResultEntry<'a>> {
    values
        .iter()
        .map(move |((id, t), value)| (name, <ID as Borrow<str>>::borrow(id), *t, *value))
}

/// Serialises a [`ValueMap`] as a map with keys of the form `"(<entity>, <t>)"`
struct KeyedValues<'a, ID>(&'a ValueMap<ID>);

impl<ID: IDLike> Serialize for KeyedValues<'_, ID> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|((id, t), value)| (format!("({id}, {t})"), value)),
        )
    }
}

impl Serialize for SolveResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(14))?;
        map.serialize_entry("objective", &self.objective)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("P", &KeyedValues(&self.generation))?;
        map.serialize_entry("Theta", &KeyedValues(&self.angle))?;
        map.serialize_entry("F", &KeyedValues(&self.flow))?;
        map.serialize_entry("LS", &KeyedValues(&self.load_shed))?;
        map.serialize_entry("V", &KeyedValues(&self.volume))?;
        map.serialize_entry("Q_t", &KeyedValues(&self.turbined))?;
        map.serialize_entry("Q_s", &KeyedValues(&self.spill))?;
        map.serialize_entry("P_h", &KeyedValues(&self.hydro_power))?;
        map.serialize_entry("u", &KeyedValues(&self.status_on))?;
        map.serialize_entry("y", &KeyedValues(&self.startup))?;
        map.serialize_entry("z", &KeyedValues(&self.shutdown))?;
        map.serialize_entry("R", &KeyedValues(&self.reserve))?;
        map.end()
    }
}

/// Load the case at `case_path`, then build and solve its model.
///
/// The solver's termination status is not checked: the values of an infeasible or otherwise
/// unsolved model are whatever the solver reports.
///
/// # Arguments
///
/// * `case_path` - Path to the YAML case file
/// * `solver_name` - Name of the solver to use (see [`SolverName`])
///
/// # Returns
///
/// The flat results, the solved model and the case data.
pub fn solve_case(
    case_path: &Path,
    solver_name: &str,
) -> Result<(SolveResults, SolvedModel, CaseData)> {
    let solver = SolverName::parse(solver_name)?;
    let case = load_case(case_path)
        .with_context(|| format!("Failed to load case from {}", case_path.display()))?;
    info!("Loaded case from {}", case_path.display());

    let model = build_model(&case).context("Failed to build model.")?;
    info!("Solving with {solver}");
    let solved = model.solve(solver)?;
    let results = SolveResults::from_model(&solved);
    info!(
        "Solver finished with status {} and objective {}",
        results.status, results.objective
    );

    Ok((results, solved, case))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::hydro_case;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    fn test_results_from_model(hydro_case: CaseData) {
        let solved = build_model(&hydro_case)
            .unwrap()
            .solve(SolverName::Highs)
            .unwrap();
        let results = SolveResults::from_model(&solved);

        assert_eq!(results.status, "Optimal");
        assert_approx_eq!(f64, results.objective, 2.0, epsilon = 1e-6);
        let key = (ReservoirID::new("R1"), 1);
        assert_approx_eq!(f64, results.volume[&key], 103.0, epsilon = 1e-6);
        assert_approx_eq!(f64, results.spill[&key], 2.0, epsilon = 1e-6);
        assert!(results.status_on.is_empty());
        assert_eq!(results.iter().count(), 7);
    }

    #[rstest]
    fn test_results_to_json(hydro_case: CaseData) {
        let solved = build_model(&hydro_case)
            .unwrap()
            .solve(SolverName::Highs)
            .unwrap();
        let results = SolveResults::from_model(&solved);
        let json: Value = serde_json::to_value(&results).unwrap();

        assert_approx_eq!(f64, json["objective"].as_f64().unwrap(), 2.0, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            json["V"]["(R1, 1)"].as_f64().unwrap(),
            103.0,
            epsilon = 1e-6
        );
        assert_approx_eq!(
            f64,
            json["P"]["(H1, 1)"].as_f64().unwrap(),
            2.5,
            epsilon = 1e-6
        );
        assert!(json["u"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_solve_case_unknown_solver() {
        let err = solve_case(Path::new("demos/case_tiny.yaml"), "cplex").unwrap_err();
        assert_eq!(err.to_string(), "Unknown solver: cplex");
    }
}
