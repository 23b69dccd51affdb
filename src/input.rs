//! Common routines for loading case files and other input data.
use crate::case::CaseData;
use anyhow::{Context, Result, bail, ensure};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// The sections which every case file must contain, in the order they are checked
const REQUIRED_SECTIONS: [&str; 4] = ["meta", "sets", "map", "params"];

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    let toml_data = toml::from_str(&toml_str)
        .with_context(|| format!("Could not parse {}", file_path.display()))?;
    Ok(toml_data)
}

/// Parse a YAML file at the specified path
pub fn read_yaml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let yaml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    let yaml_data = serde_yaml::from_str(&yaml_str)
        .with_context(|| format!("Could not parse {}", file_path.display()))?;
    Ok(yaml_data)
}

/// Load a case from a YAML file.
///
/// The top-level sections are checked before the rest of the file is deserialised, so that a
/// missing section is reported by name. Referential consistency between sections (e.g. whether
/// every generator is connected to a known bus) is not checked here; inconsistencies surface when
/// the model is built.
///
/// # Arguments
///
/// * `case_path` - Path to the case file
///
/// # Returns
///
/// The case data or an error.
pub fn load_case(case_path: &Path) -> Result<CaseData> {
    let raw: Value = read_yaml(case_path)?;
    check_sections(&raw)?;

    let case: CaseData = serde_yaml::from_value(raw)
        .with_context(|| format!("Invalid case data in {}", case_path.display()))?;
    ensure!(
        case.meta.horizon_hours > 0,
        "horizon_hours must be a positive integer"
    );

    Ok(case)
}

/// Check that the document is a mapping containing every required section
fn check_sections(raw: &Value) -> Result<()> {
    let Some(mapping) = raw.as_mapping() else {
        bail!("Case file must contain a mapping at the top level");
    };

    for key in REQUIRED_SECTIONS {
        if !mapping.contains_key(key) {
            bail!("Missing required section in case file: {key}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const CASE_TINY: &str = include_str!("../demos/case_tiny.yaml");

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Write `contents` to a file called `file_name` in `dir`
    fn write_file(dir: &Path, file_name: &str, contents: &str) -> PathBuf {
        let file_path = dir.join(file_name);
        fs::write(&file_path, contents).unwrap();
        file_path
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "test.toml", "id = \"hello\"\nvalue = 1\n");
        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1
            }
        );

        let file_path = write_file(dir.path(), "bad.toml", "id = \"hello\"\nvalue = -1\n");
        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_yaml() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "test.yaml", "id: hello\nvalue: 1\n");
        assert_eq!(
            read_yaml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1
            }
        );

        assert!(read_yaml::<Record>(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_load_case() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "case.yaml", CASE_TINY);
        let case = load_case(&file_path).unwrap();
        assert_eq!(case.horizon(), 3);
        assert_eq!(case.meta.name.as_deref(), Some("case_tiny"));
        assert_eq!(case.sets.generators.len(), 3);
        assert_eq!(case.sets.lines[0].name.to_string(), "L12");
        assert_eq!(case.params.hydro_pwl[0].len(), 3);
    }

    #[test]
    fn test_load_case_is_repeatable() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "case.yaml", CASE_TINY);
        assert_eq!(load_case(&file_path).unwrap(), load_case(&file_path).unwrap());
    }

    #[rstest]
    #[case("meta")]
    #[case("sets")]
    #[case("map")]
    #[case("params")]
    fn test_load_case_missing_section(#[case] section: &str) {
        let mut raw: Value = serde_yaml::from_str(CASE_TINY).unwrap();
        raw.as_mapping_mut().unwrap().remove(section);

        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "case.yaml",
            &serde_yaml::to_string(&raw).unwrap(),
        );
        assert_error!(
            load_case(&file_path),
            format!("Missing required section in case file: {section}")
        );
    }

    #[test]
    fn test_load_case_not_a_mapping() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "case.yaml", "- meta\n- sets\n");
        assert_error!(
            load_case(&file_path),
            "Case file must contain a mapping at the top level"
        );
    }

    #[test]
    fn test_load_case_zero_horizon() {
        let dir = tempdir().unwrap();
        let contents = CASE_TINY.replace("horizon_hours: 3", "horizon_hours: 0");
        let file_path = write_file(dir.path(), "case.yaml", &contents);
        assert_error!(
            load_case(&file_path),
            "horizon_hours must be a positive integer"
        );
    }

    #[test]
    fn test_load_case_bad_value() {
        let dir = tempdir().unwrap();
        let contents = CASE_TINY.replace("horizon_hours: 3", "horizon_hours: three");
        let file_path = write_file(dir.path(), "case.yaml", &contents);
        let err = load_case(&file_path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid case data in"));
    }

    #[test]
    fn test_load_case_missing_file() {
        let dir = tempdir().unwrap();
        assert!(load_case(&dir.path().join("missing.yaml")).is_err());
    }
}
