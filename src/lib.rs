//! Common functionality for hydrosched, a hydrothermal unit commitment and economic dispatch
//! model builder.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod case;
pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod piecewise;
pub mod reporting;
pub mod settings;
pub mod solve;
pub mod solver;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is the platform's config directory with `hydrosched` appended, or the current directory
/// if the platform has none.
pub fn get_hydrosched_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("hydrosched");
    path
}
