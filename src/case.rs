//! Case data: the validated in-memory form of a case file.
//!
//! These types carry no behaviour beyond a few lookups. Referential integrity (e.g. that every
//! generator is connected to a known bus) is not checked here; inconsistencies surface when the
//! optimisation model is built.
use crate::id::{BusID, GeneratorID, LineID, ReservoirID};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A time step in the horizon, numbered from 1
pub type TimeStep = u32;

/// A parameter given per entity
pub type ParameterMap<ID, T = f64> = IndexMap<ID, T>;

/// A parameter given per entity as a time series with one entry per time step (0-indexed)
pub type SeriesMap<ID> = IndexMap<ID, Vec<f64>>;

/// The contents of a case file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaseData {
    /// Scalar metadata
    pub meta: Meta,
    /// The sets of entities in the network
    pub sets: Sets,
    /// Maps between entities
    pub map: Maps,
    /// Numerical parameters
    pub params: Params,
}

impl CaseData {
    /// The number of time steps in the horizon
    pub fn horizon(&self) -> TimeStep {
        self.meta.horizon_hours
    }

    /// Iterate over time steps, starting at 1
    pub fn time_steps(&self) -> RangeInclusive<TimeStep> {
        1..=self.horizon()
    }
}

/// Case metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Meta {
    /// Number of hourly time steps
    pub horizon_hours: TimeStep,
    /// Optional name for the case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The sets of entities in the network
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sets {
    /// Buses
    #[serde(rename = "B")]
    pub buses: Vec<BusID>,
    /// All generators
    #[serde(rename = "G")]
    pub generators: Vec<GeneratorID>,
    /// Hydro generators
    #[serde(rename = "GH")]
    pub hydro_generators: Vec<GeneratorID>,
    /// Thermal generators
    #[serde(rename = "GT")]
    pub thermal_generators: Vec<GeneratorID>,
    /// Reservoirs
    #[serde(rename = "R")]
    pub reservoirs: Vec<ReservoirID>,
    /// Transmission lines
    #[serde(rename = "L")]
    pub lines: Vec<Line>,
}

/// A transmission line. Positive flow runs from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Line {
    /// Name of the line
    pub name: LineID,
    /// The bus where the line originates
    #[serde(rename = "i")]
    pub from: BusID,
    /// The bus where the line terminates
    #[serde(rename = "j")]
    pub to: BusID,
}

/// Maps between entities
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Maps {
    /// The bus each generator is connected to
    pub gen_bus: IndexMap<GeneratorID, BusID>,
    /// The reservoir feeding each hydro generator
    pub res_of_gen: IndexMap<GeneratorID, ReservoirID>,
    /// Electrical data for each line
    pub line_data: IndexMap<LineID, LineData>,
}

/// Electrical parameters of a line
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LineData {
    /// Susceptance
    #[serde(rename = "b")]
    pub susceptance: f64,
    /// Maximum flow in either direction
    #[serde(rename = "fmax")]
    pub flow_limit: f64,
}

/// Numerical parameters for the case
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Params {
    /// The bus whose voltage angle is fixed at zero
    pub ref_bus: BusID,
    /// Demand at each bus
    pub demand: SeriesMap<BusID>,
    /// Minimum output
    pub g_min: ParameterMap<GeneratorID>,
    /// Maximum output
    pub g_max: ParameterMap<GeneratorID>,
    /// Maximum increase in output between consecutive time steps
    pub ramp_up: ParameterMap<GeneratorID>,
    /// Maximum decrease in output between consecutive time steps
    pub ramp_dn: ParameterMap<GeneratorID>,
    /// Variable cost of thermal generation
    pub therm_cost: ParameterMap<GeneratorID>,
    /// Minimum stored volume
    pub vol_min: ParameterMap<ReservoirID>,
    /// Maximum stored volume
    pub vol_max: ParameterMap<ReservoirID>,
    /// Volume before the first time step
    pub vol0: ParameterMap<ReservoirID>,
    /// Natural inflow into each reservoir
    pub inflow: SeriesMap<ReservoirID>,
    /// Minimum turbined flow
    pub q_min: ParameterMap<ReservoirID>,
    /// Maximum turbined flow
    pub q_max: ParameterMap<ReservoirID>,
    /// Penalty costs
    pub penalties: Penalties,
    /// Unit commitment parameters for thermal generators
    pub uc: UnitCommitment,
    /// Operating reserve requirements
    #[serde(default)]
    pub reserves: Reserves,
    /// Hydro production function breakpoints for each reservoir
    pub hydro_pwl: IndexMap<ReservoirID, Vec<Breakpoint>>,
}

/// Penalty costs for slack variables
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Penalties {
    /// Cost per unit of unserved demand
    pub load_shed: f64,
    /// Cost per unit of spilled water
    pub spill: f64,
}

/// Unit commitment parameters.
///
/// Every map is optional and generators missing from a map take the default value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UnitCommitment {
    /// Cost per time step of being online
    pub no_load_cost: ParameterMap<GeneratorID>,
    /// Cost per startup
    pub startup_cost: ParameterMap<GeneratorID>,
    /// Cost per shutdown
    pub shutdown_cost: ParameterMap<GeneratorID>,
    /// Minimum number of time steps online after a startup
    pub min_up_time: ParameterMap<GeneratorID, u32>,
    /// Minimum number of time steps offline after a shutdown
    pub min_down_time: ParameterMap<GeneratorID, u32>,
    /// Status before the first time step (1 = on, 0 = off)
    pub u0: ParameterMap<GeneratorID, u8>,
    /// Hours online (positive) or offline (negative) before the horizon
    pub init_status: ParameterMap<GeneratorID, i32>,
    /// Output reachable in the time step of a startup
    pub startup_ramp: ParameterMap<GeneratorID>,
    /// Output that can be shed in the time step of a shutdown
    pub shutdown_ramp: ParameterMap<GeneratorID>,
}

impl UnitCommitment {
    /// Get the unit commitment parameters for a single generator, filling in defaults
    pub fn for_generator(&self, id: &GeneratorID) -> UnitParameters {
        let cost = |map: &ParameterMap<GeneratorID>| map.get(id).copied().unwrap_or(0.0);
        UnitParameters {
            no_load_cost: cost(&self.no_load_cost),
            startup_cost: cost(&self.startup_cost),
            shutdown_cost: cost(&self.shutdown_cost),
            min_up_time: self.min_up_time.get(id).copied().unwrap_or(1),
            min_down_time: self.min_down_time.get(id).copied().unwrap_or(1),
            initially_on: self.u0.get(id).is_some_and(|&u0| u0 > 0),
            init_status: self.init_status.get(id).copied().unwrap_or(0),
            startup_ramp: cost(&self.startup_ramp),
            shutdown_ramp: cost(&self.shutdown_ramp),
        }
    }
}

/// Unit commitment parameters for one generator, with defaults applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitParameters {
    /// Cost per time step online
    pub no_load_cost: f64,
    /// Cost per startup
    pub startup_cost: f64,
    /// Cost per shutdown
    pub shutdown_cost: f64,
    /// Minimum up time in time steps
    pub min_up_time: u32,
    /// Minimum down time in time steps
    pub min_down_time: u32,
    /// Whether the unit is online before the horizon
    pub initially_on: bool,
    /// Hours online (positive) or offline (negative) before the horizon
    pub init_status: i32,
    /// Startup ramp capability
    pub startup_ramp: f64,
    /// Shutdown ramp capability
    pub shutdown_ramp: f64,
}

/// System-wide operating reserve parameters
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Reserves {
    /// Reserve requirement per time step. Empty means no requirement.
    pub requirement: Vec<f64>,
    /// Cost per unit of reserve held by each thermal generator
    pub cost: ParameterMap<GeneratorID>,
}

/// A point on a hydro production function
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Breakpoint {
    /// Turbined flow
    #[serde(rename = "q")]
    pub flow: f64,
    /// Hydro power produced at this flow
    #[serde(rename = "p")]
    pub power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parameters_defaults() {
        let uc = UnitCommitment::default();
        let params = uc.for_generator(&"G1".into());
        assert_eq!(
            params,
            UnitParameters {
                no_load_cost: 0.0,
                startup_cost: 0.0,
                shutdown_cost: 0.0,
                min_up_time: 1,
                min_down_time: 1,
                initially_on: false,
                init_status: 0,
                startup_ramp: 0.0,
                shutdown_ramp: 0.0,
            }
        );
    }

    #[test]
    fn test_unit_parameters_given() {
        let uc: UnitCommitment = serde_yaml::from_str(
            "
startup_cost: {G1: 20}
min_up_time: {G1: 3}
u0: {G1: 1}
init_status: {G1: 2, G2: -4}
",
        )
        .unwrap();

        let params = uc.for_generator(&"G1".into());
        assert_eq!(params.startup_cost, 20.0);
        assert_eq!(params.min_up_time, 3);
        assert!(params.initially_on);
        assert_eq!(params.init_status, 2);
        assert_eq!(uc.for_generator(&"G2".into()).init_status, -4);
    }
}
