//! Run command implementation
//!
//! Loads the suite configuration, applies command-line overrides, runs every
//! connection tuple and prints the report.

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::fvt::{FvtConfig, FvtReport, ReportFormat, run_suite};

/// Run command arguments
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Explicit configuration file; otherwise `.data-engine-fvt.toml` in `workspace`
    pub config: Option<PathBuf>,
    pub workspace: PathBuf,
    pub endpoint: Option<String>,
    pub servers: Vec<String>,
    pub user: Option<String>,
    /// Report format ("json" or "yaml")
    pub format: String,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
}

/// Resolve the effective configuration for a run
pub fn load_config(args: &RunArgs) -> Result<FvtConfig, CliError> {
    load_config_with(args, |key| std::env::var(key).ok())
}

/// Resolve the configuration, taking environment overrides from `lookup`
pub fn load_config_with<F>(args: &RunArgs, lookup: F) -> Result<FvtConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.clone()));
            }
            let mut config = FvtConfig::load_file(path)?;
            config.apply_overrides(lookup);
            config
        }
        None => FvtConfig::load_with_overrides(&args.workspace, lookup)?,
    };

    if let Some(endpoint) = &args.endpoint {
        config.platform.url = endpoint.clone();
    }
    if let Some(user) = &args.user {
        config.platform.user_id = user.clone();
    }
    if !args.servers.is_empty() {
        config.platform.servers = args.servers.clone();
    }
    // explicit tuples would hide the overrides above
    if args.endpoint.is_some() || args.user.is_some() || !args.servers.is_empty() {
        config.connections.clear();
    }
    Ok(config)
}

/// Handle the run command
pub fn handle_run(args: &RunArgs) -> Result<FvtReport, CliError> {
    let config = load_config(args)?;
    run_with_config(args, &config)
}

/// Run the suite for a resolved configuration and emit the report
pub fn run_with_config(args: &RunArgs, config: &FvtConfig) -> Result<FvtReport, CliError> {
    let format: ReportFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))?;
    let report = rt.block_on(run_suite(config))?;

    let rendered = report.render(format)?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?,
        None => println!("{}", rendered),
    }

    let failed = report.connections.iter().filter(|c| !c.passed()).count();
    if failed > 0 {
        return Err(CliError::SuiteFailed {
            failed,
            total: report.connections.len(),
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_overrides_replace_explicit_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fvt.toml");
        std::fs::write(
            &path,
            r#"
[[connections]]
server_platform_url = "https://a:1"
server_name = "serverinmem"
user_id = "x"
"#,
        )
        .unwrap();

        let args = RunArgs {
            config: Some(path),
            servers: vec!["servergraph".to_string()],
            ..Default::default()
        };
        let config = load_config_with(&args, |_| None).unwrap();
        assert!(config.connections.is_empty());
        assert_eq!(config.connection_details()[0].server_name, "servergraph");
    }

    #[test]
    fn test_missing_config_file() {
        let args = RunArgs {
            config: Some(PathBuf::from("/does/not/exist.toml")),
            ..Default::default()
        };
        assert!(matches!(
            load_config_with(&args, |_| None),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_run_writes_report() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("report.yaml");
        let args = RunArgs {
            workspace: dir.path().to_path_buf(),
            format: "yaml".to_string(),
            output: Some(output.clone()),
            ..Default::default()
        };
        let config = load_config_with(&args, |_| None).unwrap();
        let report = run_with_config(&args, &config).unwrap();
        assert!(report.passed());
        let written = std::fs::read_to_string(output).unwrap();
        assert!(written.contains("servergraph"));
    }

    #[test]
    fn test_environment_lookup_is_applied() {
        let dir = tempdir().unwrap();
        let args = RunArgs {
            workspace: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = load_config_with(&args, |key| {
            (key == crate::fvt::config::ENV_SERVERS).then(|| "servergraph".to_string())
        })
        .unwrap();
        let details = config.connection_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].server_name, "servergraph");

        // command-line values win over the environment
        let args = RunArgs {
            user: Some("cli-user".to_string()),
            ..args
        };
        let config = load_config_with(&args, |key| {
            (key == crate::fvt::config::ENV_USER_ID).then(|| "env-user".to_string())
        })
        .unwrap();
        assert_eq!(config.platform.user_id, "cli-user");
    }
}
