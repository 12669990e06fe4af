//! Configuration commands

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::fvt::config::CONFIG_FILENAME;
use crate::fvt::{FvtConfig, sample_config};

/// Write the sample configuration into a directory, or print it
pub fn handle_sample_config(dir: Option<&Path>) -> Result<(), CliError> {
    match dir {
        Some(dir) => {
            let path: PathBuf = dir.join(CONFIG_FILENAME);
            std::fs::write(&path, sample_config())
                .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", sample_config()),
    }
    Ok(())
}

/// Print the effective configuration and the connection tuples it yields
pub fn handle_show_config(workspace: &Path) -> Result<(), CliError> {
    let config = FvtConfig::load(workspace)?;
    config.validate()?;
    println!("{}", config.to_toml()?);
    for details in config.connection_details() {
        println!("# {}", details);
    }
    Ok(())
}
