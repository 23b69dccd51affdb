//! Fixtures for tests
use crate::case::CaseData;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Parse case data from YAML
fn parse_case(yaml: &str) -> CaseData {
    serde_yaml::from_str(yaml).unwrap()
}

/// A single thermal unit over five time steps with a minimum up time of three
#[fixture]
pub fn thermal_case() -> CaseData {
    parse_case(include_str!("../tests/data/min_up_time.yaml"))
}

/// A single reservoir and hydro unit over one time step
#[fixture]
pub fn hydro_case() -> CaseData {
    parse_case(include_str!("../tests/data/reservoir_balance.yaml"))
}

/// Two buses, two thermal units and one hydro unit over three time steps
#[fixture]
pub fn two_bus_case() -> CaseData {
    parse_case(include_str!("../demos/case_tiny.yaml"))
}
