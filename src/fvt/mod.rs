//! Functional verification suite
//!
//! Runs the data engine scenarios once per connection tuple
//! (platform URL, server variant, user). Each tuple gets its own client and
//! repository; nothing is shared between tuples. Within a tuple the first
//! failed check ends the run with [`FvtError::ScenarioFailed`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::verification::VerificationError;

pub mod config;
pub mod connection;
pub mod runner;
pub mod scenarios;

pub use config::{FvtConfig, sample_config};
pub use connection::{ConnectionDetails, FvtConnection, PlatformConnectionProvider};
pub use runner::{ConnectionReport, FvtReport, ReportFormat, ScenarioOutcome, run_it, run_suite};
pub use scenarios::DataEngineFvt;

/// Error type for suite configuration and execution
#[derive(Debug, thiserror::Error)]
pub enum FvtError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid server platform URL: {0}")]
    InvalidEndpoint(String),

    #[error("{0}")]
    UnknownVariant(String),

    #[error("Scenario {scenario} failed: {source}")]
    ScenarioFailed {
        scenario: Scenario,
        #[source]
        source: VerificationError,
    },
}

/// Result type for suite operations
pub type FvtResult<T> = Result<T, FvtError>;

/// Scenarios run against every connection tuple, in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scenario {
    RegisterExternalTool,
    VerifyLineageMappingsForAJobProcess,
    UpsertDatabase,
    UpsertRelationalTable,
    UpsertDataFile,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::RegisterExternalTool,
        Scenario::VerifyLineageMappingsForAJobProcess,
        Scenario::UpsertDatabase,
        Scenario::UpsertRelationalTable,
        Scenario::UpsertDataFile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::RegisterExternalTool => "registerExternalTool",
            Scenario::VerifyLineageMappingsForAJobProcess => "verifyLineageMappingsForAJobProcess",
            Scenario::UpsertDatabase => "upsertDatabase",
            Scenario::UpsertRelationalTable => "upsertRelationalTable",
            Scenario::UpsertDataFile => "upsertDataFile",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown scenario: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names() {
        assert_eq!(Scenario::UpsertDataFile.to_string(), "upsertDataFile");
        assert_eq!(
            "upsertdatabase".parse::<Scenario>().unwrap(),
            Scenario::UpsertDatabase
        );
        assert!("dropDatabase".parse::<Scenario>().is_err());
        assert_eq!(
            serde_json::to_string(&Scenario::RegisterExternalTool).unwrap(),
            "\"registerExternalTool\""
        );
    }
}
