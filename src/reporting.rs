//! Post-processing of results for display and output to file.
use crate::case::TimeStep;
use crate::id::GeneratorID;
use crate::solve::SolveResults;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// The output file name for all variable values
pub const RESULTS_FILE_NAME: &str = "results.csv";

/// The output file name for the per-generator dispatch
pub const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The number of generation entries shown in the text summary
const SUMMARY_ENTRIES: usize = 10;

/// The generation of each generator over time
pub type Dispatch = IndexMap<GeneratorID, Vec<(TimeStep, f64)>>;

/// Group generation values by generator.
///
/// Generators are in the order in which they first appear in the results and each series is
/// sorted by time step.
pub fn summarise_dispatch(results: &SolveResults) -> Dispatch {
    let mut dispatch = Dispatch::new();
    for ((g, t), value) in &results.generation {
        dispatch.entry(g.clone()).or_default().push((*t, *value));
    }

    for series in dispatch.values_mut() {
        series.sort_by_key(|(t, _)| *t);
    }

    dispatch
}

/// A short human-readable summary: the objective and the first few generation values
pub fn format_summary(results: &SolveResults) -> String {
    let mut out = format!("Objective: {}\n", results.objective);
    out.push_str("Generation (P[g,t]) - first 10:\n");
    for ((g, t), value) in results.generation.iter().take(SUMMARY_ENTRIES) {
        // Writing to a String can't fail
        let _ = writeln!(out, "  {:>4} t={t}: {value:.2}", g.to_string());
    }

    out
}

/// Create the output directory, including parents, if it doesn't exist
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Represents a row of the results CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ResultRow<'a> {
    variable: &'a str,
    entity: &'a str,
    time: TimeStep,
    value: f64,
}

/// Represents a row of the dispatch CSV file
#[derive(Serialize, Debug, PartialEq)]
struct DispatchRow<'a> {
    generator: &'a str,
    time: TimeStep,
    generation: f64,
}

/// Write every variable value to `results.csv` and the generation of each generator to
/// `dispatch.csv` in `output_dir`
pub fn write_results(output_dir: &Path, results: &SolveResults) -> Result<()> {
    let file_path = output_dir.join(RESULTS_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for (variable, entity, time, value) in results.iter() {
        writer.serialize(ResultRow {
            variable,
            entity,
            time,
            value,
        })?;
    }
    writer.flush()?;

    let file_path = output_dir.join(DISPATCH_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for (g, series) in &summarise_dispatch(results) {
        for &(time, generation) in series {
            writer.serialize(DispatchRow {
                generator: &g.0,
                time,
                generation,
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve::ValueMap;
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use tempfile::tempdir;

    #[fixture]
    fn results() -> SolveResults {
        // NB: deliberately out of time order for G2
        let generation: ValueMap<GeneratorID> = [
            (("G1", 1), 10.0),
            (("G2", 2), 7.5),
            (("G1", 2), 20.0),
            (("G2", 1), 5.0),
        ]
        .into_iter()
        .map(|((g, t), value)| ((g.into(), t), value))
        .collect();

        SolveResults {
            objective: 123.5,
            status: "Optimal".to_string(),
            generation,
            angle: ValueMap::new(),
            flow: ValueMap::new(),
            load_shed: [(("B1".into(), 1), 0.0)].into_iter().collect(),
            volume: ValueMap::new(),
            turbined: ValueMap::new(),
            spill: ValueMap::new(),
            hydro_power: ValueMap::new(),
            status_on: ValueMap::new(),
            startup: ValueMap::new(),
            shutdown: ValueMap::new(),
            reserve: ValueMap::new(),
        }
    }

    #[rstest]
    fn test_summarise_dispatch(results: SolveResults) {
        let dispatch = summarise_dispatch(&results);
        assert_eq!(
            dispatch.keys().map(ToString::to_string).collect_vec(),
            ["G1", "G2"]
        );
        assert_eq!(dispatch[0], vec![(1, 10.0), (2, 20.0)]);
        assert_eq!(dispatch[1], vec![(1, 5.0), (2, 7.5)]);
    }

    #[rstest]
    fn test_format_summary(results: SolveResults) {
        let expected = "Objective: 123.5
Generation (P[g,t]) - first 10:
    G1 t=1: 10.00
    G2 t=2: 7.50
    G1 t=2: 20.00
    G2 t=1: 5.00
";
        assert_eq!(format_summary(&results), expected);
    }

    #[rstest]
    fn test_format_summary_truncated(mut results: SolveResults) {
        results.generation = (1..=12).map(|t| (("G1".into(), t), 1.0)).collect();
        let summary = format_summary(&results);
        assert_eq!(summary.lines().count(), 2 + SUMMARY_ENTRIES);
        assert!(summary.ends_with("t=10: 1.00\n"));
    }

    #[rstest]
    fn test_write_results(results: SolveResults) {
        let dir = tempdir().unwrap();
        write_results(dir.path(), &results).unwrap();

        let records: Vec<(String, String, TimeStep, f64)> =
            csv::Reader::from_path(dir.path().join(RESULTS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(
            records[0],
            ("P".to_string(), "G1".to_string(), 1, 10.0)
        );
        assert_eq!(
            records[4],
            ("LS".to_string(), "B1".to_string(), 1, 0.0)
        );

        let records: Vec<(String, TimeStep, f64)> =
            csv::Reader::from_path(dir.path().join(DISPATCH_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_eq!(
            records,
            [
                ("G1".to_string(), 1, 10.0),
                ("G1".to_string(), 2, 20.0),
                ("G2".to_string(), 1, 5.0),
                ("G2".to_string(), 2, 7.5),
            ]
        );
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("a").join("b");
        create_output_directory(&output_dir).unwrap();
        assert!(output_dir.is_dir());

        // Already exists
        create_output_directory(&output_dir).unwrap();
    }
}
