//! Constraints for the DC power flow network.
use super::{VariableMap, at, get_param, get_series};
use crate::case::CaseData;
use crate::id::{BusID, GeneratorID};
use crate::solver::Problem;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Add the DC power flow equations and line flow limits.
///
/// `F[l,t] = B[l] * (Theta[i,t] - Theta[j,t])` and `-Fmax[l] <= F[l,t] <= Fmax[l]`.
pub fn add_dc_flow_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    for line in &case.sets.lines {
        let data = get_param(&case.map.line_data, &line.name, "line_data")?;
        for t in case.time_steps() {
            let flow = variables.flow.get(&line.name, t)?;
            let angle_from = variables.angle.get(&line.from, t)?;
            let angle_to = variables.angle.get(&line.to, t)?;
            problem.add_row(
                0.0..=0.0,
                [
                    (flow, 1.0),
                    (angle_from, -data.susceptance),
                    (angle_to, data.susceptance),
                ],
            );
            problem.add_row(-data.flow_limit..=data.flow_limit, [(flow, 1.0)]);
        }
    }

    Ok(())
}

/// Fix the voltage angle of the reference bus at zero
pub fn add_reference_angle_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    for t in case.time_steps() {
        let angle = variables.angle.get(&case.params.ref_bus, t)?;
        problem.add_row(0.0..=0.0, [(angle, 1.0)]);
    }

    Ok(())
}

/// Add the supply-demand balance at each bus.
///
/// Generation at the bus plus flow on lines terminating at the bus, minus flow on lines
/// originating there, plus load shedding, equals demand.
pub fn add_nodal_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    for (b, generators) in generators_by_bus(case)? {
        let demand = get_series(&case.params.demand, b, "demand", case.horizon())?;
        for t in case.time_steps() {
            let mut terms = vec![(variables.load_shed.get(b, t)?, 1.0)];
            for g in &generators {
                terms.push((variables.generation.get(g, t)?, 1.0));
            }
            for line in &case.sets.lines {
                if line.to == *b {
                    terms.push((variables.flow.get(&line.name, t)?, 1.0));
                }
                if line.from == *b {
                    terms.push((variables.flow.get(&line.name, t)?, -1.0));
                }
            }

            let rhs = at(demand, t);
            problem.add_row(rhs..=rhs, terms);
        }
    }

    Ok(())
}

/// Group the generators by the bus they are connected to
fn generators_by_bus(case: &CaseData) -> Result<IndexMap<&BusID, Vec<&GeneratorID>>> {
    let mut generators: IndexMap<_, Vec<_>> =
        case.sets.buses.iter().map(|b| (b, Vec::new())).collect();

    for g in &case.sets.generators {
        let b = get_param(&case.map.gen_bus, g, "gen_bus")?;
        generators
            .get_mut(b)
            .with_context(|| format!("Unknown bus {b} for generator {g}"))?
            .push(g);
    }

    Ok(generators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, two_bus_case};
    use crate::model::build_model;
    use rstest::rstest;

    #[rstest]
    fn test_generators_by_bus(two_bus_case: CaseData) {
        let generators = generators_by_bus(&two_bus_case).unwrap();
        let as_str: Vec<(String, Vec<String>)> = generators
            .into_iter()
            .map(|(b, gens)| (b.to_string(), gens.iter().map(ToString::to_string).collect()))
            .collect();
        assert_eq!(
            as_str,
            vec![
                ("B1".to_string(), vec!["G1".to_string(), "H1".to_string()]),
                ("B2".to_string(), vec!["G2".to_string()]),
            ]
        );
    }

    #[rstest]
    fn test_unknown_generator_bus(mut two_bus_case: CaseData) {
        two_bus_case.map.gen_bus.insert("G2".into(), "B9".into());
        assert_error!(
            build_model(&two_bus_case),
            "Unknown bus B9 for generator G2"
        );
    }

    #[rstest]
    fn test_unknown_line_endpoint(mut two_bus_case: CaseData) {
        two_bus_case.sets.lines[0].to = "B9".into();
        assert_error!(build_model(&two_bus_case), "No Theta variable for B9 at t=1");
    }

    #[rstest]
    fn test_unknown_reference_bus(mut two_bus_case: CaseData) {
        two_bus_case.params.ref_bus = "B9".into();
        assert_error!(build_model(&two_bus_case), "No Theta variable for B9 at t=1");
    }

    #[rstest]
    fn test_missing_line_data(mut two_bus_case: CaseData) {
        two_bus_case.map.line_data.clear();
        assert_error!(build_model(&two_bus_case), "Missing line_data for L12");
    }
}
