//! Suite runner and run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, warn};

use super::config::FvtConfig;
use super::connection::{ConnectionDetails, PlatformConnectionProvider};
use super::scenarios::DataEngineFvt;
use super::{FvtError, FvtResult, Scenario};

/// Result of one scenario on one connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scenarios run against one connection tuple, up to the first failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub connection: ConnectionDetails,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl ConnectionReport {
    pub fn passed(&self) -> bool {
        self.outcomes.len() == Scenario::ALL.len() && self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failure(&self) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| !o.passed)
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            _ => Err(format!("Unknown report format: {}. Use 'json' or 'yaml'.", s)),
        }
    }
}

/// Report of a whole suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FvtReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub connections: Vec<ConnectionReport>,
}

impl FvtReport {
    pub fn passed(&self) -> bool {
        self.connections.iter().all(ConnectionReport::passed)
    }

    pub fn to_json(&self) -> FvtResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            FvtError::SerializationError(format!("Failed to serialize report: {}", e))
        })
    }

    pub fn to_yaml(&self) -> FvtResult<String> {
        serde_yaml::to_string(self).map_err(|e| {
            FvtError::SerializationError(format!("Failed to serialize report: {}", e))
        })
    }

    pub fn render(&self, format: ReportFormat) -> FvtResult<String> {
        match format {
            ReportFormat::Json => self.to_json(),
            ReportFormat::Yaml => self.to_yaml(),
        }
    }
}

/// Run every scenario against one tuple, stopping at the first failure
pub async fn run_connection(
    provider: &PlatformConnectionProvider,
    fvt: &DataEngineFvt,
    details: &ConnectionDetails,
) -> FvtResult<ConnectionReport> {
    let mut conn = provider.connect(details)?;
    let mut outcomes = Vec::new();

    for scenario in Scenario::ALL {
        match fvt.run(scenario, &mut conn).await {
            Ok(()) => outcomes.push(ScenarioOutcome {
                scenario,
                passed: true,
                error: None,
            }),
            Err(e) => {
                warn!("{} failed against {}: {}", scenario, details, e);
                outcomes.push(ScenarioOutcome {
                    scenario,
                    passed: false,
                    error: Some(e.to_string()),
                });
                break;
            }
        }
    }

    Ok(ConnectionReport {
        connection: details.clone(),
        outcomes,
    })
}

/// Run the suite for a single tuple, failing on the first violation
///
/// ```rust,no_run
/// # async fn demo() -> data_engine_fvt::fvt::FvtResult<()> {
/// data_engine_fvt::fvt::run_it("https://localhost:10443", "serverinmem", "garygeeke").await
/// # }
/// ```
pub async fn run_it(server_platform_url: &str, server_name: &str, user_id: &str) -> FvtResult<()> {
    let details = ConnectionDetails::new(server_platform_url, server_name, user_id);
    let provider = PlatformConnectionProvider::new(vec![details.clone()]);
    let fvt = DataEngineFvt::default();
    let mut conn = provider.connect(&details)?;

    for scenario in Scenario::ALL {
        fvt.run(scenario, &mut conn)
            .await
            .map_err(|source| FvtError::ScenarioFailed { scenario, source })?;
    }
    info!("All scenarios passed against {}", details);
    Ok(())
}

/// Run the suite for every configured tuple
///
/// Configuration errors abort before anything runs; scenario failures are
/// recorded per tuple and the remaining tuples still run.
pub async fn run_suite(config: &FvtConfig) -> FvtResult<FvtReport> {
    config.validate()?;
    let provider = PlatformConnectionProvider::from_config(config);
    let fvt = DataEngineFvt::default();
    let started_at = Utc::now();

    let mut connections = Vec::new();
    for details in provider.connection_details() {
        connections.push(run_connection(&provider, &fvt, details).await?);
    }

    let report = FvtReport {
        started_at,
        finished_at: Utc::now(),
        connections,
    };
    info!(
        "Suite finished: {} of {} connections passed",
        report.connections.iter().filter(|c| c.passed()).count(),
        report.connections.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("yml".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert!("xml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_partial_run_does_not_pass() {
        let report = ConnectionReport {
            connection: ConnectionDetails::new("https://localhost:10443", "serverinmem", "garygeeke"),
            outcomes: vec![ScenarioOutcome {
                scenario: Scenario::RegisterExternalTool,
                passed: true,
                error: None,
            }],
        };
        assert!(!report.passed());
        assert!(report.failure().is_none());
    }
}
