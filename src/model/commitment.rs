//! Constraints for thermal generators: commitment, ramping, minimum up/down times and reserves.
use super::{VariableMap, at, get_param};
use crate::case::{CaseData, TimeStep, UnitParameters};
use crate::solver::Problem;
use anyhow::{Result, ensure};
use std::ops::RangeInclusive;

/// Add output limits for thermal generators: `Gmin * u <= P <= Gmax * u`
pub fn add_thermal_generation_limits(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for g in &case.sets.thermal_generators {
        let g_min = *get_param(&params.g_min, g, "g_min")?;
        let g_max = *get_param(&params.g_max, g, "g_max")?;
        for t in case.time_steps() {
            let p = variables.generation.get(g, t)?;
            let u = variables.status.get(g, t)?;
            problem.add_row(0.0.., [(p, 1.0), (u, -g_min)]);
            problem.add_row(..=0.0, [(p, 1.0), (u, -g_max)]);
        }
    }

    Ok(())
}

/// Add ramp limits for thermal generators.
///
/// A unit may ramp up by `Rup` if it was online in the previous time step, or up to `SUcap` in the
/// time step it starts. Likewise it may ramp down by `Rdn` if it stays online or by `SDcap` when
/// it shuts down. The first time step is unconstrained.
pub fn add_thermal_ramp_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for g in &case.sets.thermal_generators {
        let ramp_up = *get_param(&params.ramp_up, g, "ramp_up")?;
        let ramp_dn = *get_param(&params.ramp_dn, g, "ramp_dn")?;
        let unit = params.uc.for_generator(g);
        for t in case.time_steps().skip(1) {
            let p = variables.generation.get(g, t)?;
            let p_prev = variables.generation.get(g, t - 1)?;
            let u = variables.status.get(g, t)?;
            let u_prev = variables.status.get(g, t - 1)?;
            let y = variables.startup.get(g, t)?;
            let z = variables.shutdown.get(g, t)?;

            problem.add_row(
                ..=0.0,
                [
                    (p, 1.0),
                    (p_prev, -1.0),
                    (u_prev, -ramp_up),
                    (y, -unit.startup_ramp),
                ],
            );
            problem.add_row(
                ..=0.0,
                [
                    (p_prev, 1.0),
                    (p, -1.0),
                    (u, -ramp_dn),
                    (z, -unit.shutdown_ramp),
                ],
            );
        }
    }

    Ok(())
}

/// Link status to startup and shutdown: `u[g,t] - u[g,t-1] = y[g,t] - z[g,t]`.
///
/// At the first time step, the status before the horizon (`u0`) takes the place of `u[g,0]`. A unit
/// cannot start up and shut down in the same time step: `y[g,t] + z[g,t] <= 1`.
pub fn add_commitment_logic(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    for g in &case.sets.thermal_generators {
        let unit = case.params.uc.for_generator(g);
        for t in case.time_steps() {
            let u = variables.status.get(g, t)?;
            let y = variables.startup.get(g, t)?;
            let z = variables.shutdown.get(g, t)?;
            let mut terms = vec![(u, 1.0), (y, -1.0), (z, 1.0)];
            let rhs = if t == 1 {
                if unit.initially_on { 1.0 } else { 0.0 }
            } else {
                terms.push((variables.status.get(g, t - 1)?, -1.0));
                0.0
            };
            problem.add_row(rhs..=rhs, terms);
            problem.add_row(..=1.0, [(y, 1.0), (z, 1.0)]);
        }
    }

    Ok(())
}

/// The time steps in the window starting at `t` and lasting `length` steps, cut off at the horizon
fn window(t: TimeStep, length: u32, horizon: TimeStep) -> RangeInclusive<TimeStep> {
    t..=horizon.min(t.saturating_add(length.saturating_sub(1)))
}

/// Add minimum up and down time constraints.
///
/// A startup at `t` forces the unit to stay online for the following `MUT` time steps (or until
/// the end of the horizon), i.e. `sum(u[g,t..t+MUT-1]) >= len * y[g,t]`. Similarly, a shutdown
/// forces `sum(1 - u[g,t..t+MDT-1]) >= len * z[g,t]`. Units with a minimum time of one are not
/// constrained.
pub fn add_min_up_down_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let horizon = case.horizon();
    for g in &case.sets.thermal_generators {
        let unit = case.params.uc.for_generator(g);
        for t in case.time_steps() {
            if unit.min_up_time > 1 {
                let steps = window(t, unit.min_up_time, horizon);
                let len = f64::from(steps.end() - steps.start() + 1);
                let mut terms = vec![(variables.startup.get(g, t)?, -len)];
                for tt in steps {
                    terms.push((variables.status.get(g, tt)?, 1.0));
                }
                problem.add_row(0.0.., terms);
            }

            if unit.min_down_time > 1 {
                // NB: sum(1 - u) >= len * z rearranges to sum(u) + len * z <= len
                let steps = window(t, unit.min_down_time, horizon);
                let len = f64::from(steps.end() - steps.start() + 1);
                let mut terms = vec![(variables.shutdown.get(g, t)?, len)];
                for tt in steps {
                    terms.push((variables.status.get(g, tt)?, 1.0));
                }
                problem.add_row(..=len, terms);
            }
        }
    }

    Ok(())
}

/// Lock the status of units which must honour a minimum up/down time carried over from before
/// the horizon.
///
/// A unit which has been online for `s` hours must stay online for `MUT - s` more time steps and
/// one which has been offline for `s` hours must stay offline for `MDT - s` more.
pub fn add_initial_status_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let horizon = case.horizon();
    for g in &case.sets.thermal_generators {
        let unit = case.params.uc.for_generator(g);
        let Some((lock, online)) = initial_lock(&unit) else {
            continue;
        };

        let status = if online { 1.0 } else { 0.0 };
        for t in 1..=lock.min(horizon) {
            let u = variables.status.get(g, t)?;
            problem.add_row(status..=status, [(u, 1.0)]);
        }
    }

    Ok(())
}

/// The number of time steps a unit's status is locked for at the start of the horizon and
/// whether it is locked online, or `None` if its pre-horizon status is unknown
fn initial_lock(unit: &UnitParameters) -> Option<(u32, bool)> {
    let hours = unit.init_status.unsigned_abs();
    match unit.init_status {
        s if s > 0 => Some((unit.min_up_time.saturating_sub(hours), true)),
        s if s < 0 => Some((unit.min_down_time.saturating_sub(hours), false)),
        _ => None,
    }
}

/// Add reserve constraints.
///
/// Only the headroom of committed thermal units counts towards reserve
/// (`R[g,t] <= Gmax * u[g,t] - P[g,t]`) and the total reserve must meet the system requirement at
/// every time step.
pub fn add_reserve_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    case: &CaseData,
) -> Result<()> {
    let params = &case.params;
    for g in &case.sets.thermal_generators {
        let g_max = *get_param(&params.g_max, g, "g_max")?;
        for t in case.time_steps() {
            let reserve = variables.reserve.get(g, t)?;
            let p = variables.generation.get(g, t)?;
            let u = variables.status.get(g, t)?;
            problem.add_row(..=0.0, [(reserve, 1.0), (p, 1.0), (u, -g_max)]);
        }
    }

    let requirement = &params.reserves.requirement;
    ensure!(
        requirement.is_empty() || requirement.len() == case.horizon() as usize,
        "Reserve requirement has {} entries, expected {}",
        requirement.len(),
        case.horizon()
    );
    for t in case.time_steps() {
        let required = if requirement.is_empty() {
            0.0
        } else {
            at(requirement, t)
        };

        let mut terms = Vec::new();
        for g in &case.sets.thermal_generators {
            terms.push((variables.reserve.get(g, t)?, 1.0));
        }
        problem.add_row(required.., terms);
    }

    Ok(())
}
