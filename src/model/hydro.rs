//! Constraints for hydro generators, reservoirs and hydro production functions.
use super::{VariableMap, at, get_param, get_series};
use crate::case::CaseData;
use crate::id::{GeneratorID, ReservoirID};
use crate::piecewise::PiecewiseFunction;
use crate::solver::{Problem, Variable};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::iter;

/// Add hard output limits for hydro generators.
///
/// Hydro units have no commitment decision, so `Gmin <= P <= Gmax` at every time step.
pub fn add_hydro_generation_limits(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for g in &case.sets.hydro_generators {
        let g_min = *get_param(&params.g_min, g, "g_min")?;
        let g_max = *get_param(&params.g_max, g, "g_max")?;
        for t in case.time_steps() {
            let p = variables.generation.get(g, t)?;
            problem.add_row(g_min..=g_max, [(p, 1.0)]);
        }
    }

    Ok(())
}

/// Add ramp limits for hydro generators.
///
/// There is no constraint at the first time step, as nothing links it to the time before the
/// horizon.
pub fn add_hydro_ramp_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for g in &case.sets.hydro_generators {
        let ramp_up = *get_param(&params.ramp_up, g, "ramp_up")?;
        let ramp_dn = *get_param(&params.ramp_dn, g, "ramp_dn")?;
        for t in case.time_steps().skip(1) {
            let p = variables.generation.get(g, t)?;
            let p_prev = variables.generation.get(g, t - 1)?;
            problem.add_row(..=ramp_up, [(p, 1.0), (p_prev, -1.0)]);
            problem.add_row(..=ramp_dn, [(p_prev, 1.0), (p, -1.0)]);
        }
    }

    Ok(())
}

/// Add volume and turbined flow limits and the water balance for each reservoir.
///
/// The water balance is `V[r,t] = V[r,t-1] + inflow[r,t] - Q_t[r,t] - Q_s[r,t]`, with the initial
/// volume `V0[r]` in place of `V[r,0]`.
pub fn add_reservoir_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for r in &case.sets.reservoirs {
        let vol_min = *get_param(&params.vol_min, r, "vol_min")?;
        let vol_max = *get_param(&params.vol_max, r, "vol_max")?;
        let vol0 = *get_param(&params.vol0, r, "vol0")?;
        let q_min = *get_param(&params.q_min, r, "q_min")?;
        let q_max = *get_param(&params.q_max, r, "q_max")?;
        let inflow = get_series(&params.inflow, r, "inflow", case.horizon())?;

        for t in case.time_steps() {
            let volume = variables.volume.get(r, t)?;
            let turbined = variables.turbined.get(r, t)?;
            let spill = variables.spill.get(r, t)?;
            problem.add_row(vol_min..=vol_max, [(volume, 1.0)]);
            problem.add_row(q_min..=q_max, [(turbined, 1.0)]);

            let mut terms = vec![(volume, 1.0), (turbined, 1.0), (spill, 1.0)];
            let mut rhs = at(inflow, t);
            if t == 1 {
                rhs += vol0;
            } else {
                terms.push((variables.volume.get(r, t - 1)?, -1.0));
            }
            problem.add_row(rhs..=rhs, terms);
        }
    }

    Ok(())
}

/// Add the hydro production function for each reservoir and couple it to unit output.
///
/// `P_h[r,t]` is pinned to the piecewise-linear production curve evaluated at `Q_t[r,t]`, and the
/// output of the hydro units fed by reservoir `r` must add up to `P_h[r,t]`.
pub fn add_hydro_production_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    for r in &case.sets.reservoirs {
        let table = get_param(&case.params.hydro_pwl, r, "hydro_pwl")?;
        let func = PiecewiseFunction::new(table)
            .with_context(|| format!("Invalid hydro production function for reservoir {r}"))?;

        for t in case.time_steps() {
            let turbined = variables.turbined.get(r, t)?;
            let power = variables.hydro_power.get(r, t)?;
            add_piecewise_equality(problem, &func, turbined, power);
        }
    }

    for (r, units) in units_by_reservoir(case)? {
        for t in case.time_steps() {
            let mut terms = vec![(variables.hydro_power.get(r, t)?, -1.0)];
            for g in &units {
                terms.push((variables.generation.get(g, t)?, 1.0));
            }
            problem.add_row(0.0..=0.0, terms);
        }
    }

    Ok(())
}

/// Group the hydro generators by the reservoir feeding them
fn units_by_reservoir(case: &CaseData) -> Result<IndexMap<&ReservoirID, Vec<&GeneratorID>>> {
    let mut units: IndexMap<_, Vec<_>> = case
        .sets
        .reservoirs
        .iter()
        .map(|r| (r, Vec::new()))
        .collect();

    for g in &case.sets.hydro_generators {
        let r = get_param(&case.map.res_of_gen, g, "res_of_gen")?;
        units
            .get_mut(r)
            .with_context(|| format!("Unknown reservoir {r} for generator {g}"))?
            .push(g);
    }

    Ok(units)
}

/// Constrain `(flow, power)` to lie on the piecewise-linear function.
///
/// Uses a convex combination of the breakpoints: one weight per breakpoint, summing to one, with
/// flow and power both given by the weighted sums. If there is more than one segment, a binary
/// variable selects a segment and only the weights of that segment's two breakpoints may be
/// non-zero.
fn add_piecewise_equality(
    problem: &mut Problem,
    func: &PiecewiseFunction,
    flow: Variable,
    power: Variable,
) {
    let breakpoints = func.breakpoints();
    let weights: Vec<_> = breakpoints
        .iter()
        .map(|_| problem.add_continuous(0.0, 0.0..=1.0))
        .collect();

    problem.add_row(1.0..=1.0, weights.iter().map(|&w| (w, 1.0)));
    problem.add_row(
        0.0..=0.0,
        iter::once((flow, -1.0)).chain(weights.iter().zip(breakpoints).map(|(&w, pt)| (w, pt.flow))),
    );
    problem.add_row(
        0.0..=0.0,
        iter::once((power, -1.0)).chain(weights.iter().copied().zip(func.breakpoint_powers())),
    );

    let num_segments = func.num_segments();
    if num_segments < 2 {
        return;
    }

    let segments: Vec<_> = (0..num_segments).map(|_| problem.add_binary(0.0)).collect();
    problem.add_row(1.0..=1.0, segments.iter().map(|&s| (s, 1.0)));

    // Breakpoint k borders segments k - 1 and k
    for (k, &weight) in weights.iter().enumerate() {
        let adjacent = &segments[k.saturating_sub(1)..(k + 1).min(num_segments)];
        problem.add_row(
            ..=0.0,
            iter::once((weight, 1.0)).chain(adjacent.iter().map(|&s| (s, -1.0))),
        );
    }
}
