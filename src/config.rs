//! Command-line and environment configuration.

use crate::error::FleetError;
use crate::processor::SourcePaths;
use crate::types::Period;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fleet-activity")]
#[command(version, about = "Daily fleet activity grid from vehicle and route spreadsheets", long_about = None)]
pub struct Cli {
    /// Directory holding the source spreadsheets
    #[arg(long, env = "FLEET_RESOURCE_DIR", default_value = "resource")]
    pub resource_dir: PathBuf,

    /// Vehicle registry file name inside the resource directory
    #[arg(long, env = "FLEET_VEHICLES_FILE", default_value = "Base-Veiculos.xlsx")]
    pub vehicles_file: String,

    /// Route log file name inside the resource directory
    #[arg(long, env = "FLEET_ROUTES_FILE", default_value = "Base Rotas.xlsx")]
    pub routes_file: String,

    /// Month to report, 0-indexed (0 = January)
    #[arg(short, long, default_value_t = 6)]
    pub month: u32,

    /// Year to report
    #[arg(short, long, default_value_t = 2025)]
    pub year: i32,

    /// Directory exports are written to
    #[arg(short, long, env = "FLEET_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Rows per grid page
    #[arg(long, default_value_t = 10)]
    pub per_page: usize,

    /// Load, print the first page, export and exit without prompting
    #[arg(long)]
    pub batch: bool,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sources: SourcePaths,
    pub period: Period,
    pub out_dir: PathBuf,
    pub per_page: usize,
    pub batch: bool,
}

impl Cli {
    pub fn settings(&self) -> Result<Settings, FleetError> {
        Ok(Settings {
            sources: SourcePaths::in_dir(&self.resource_dir, &self.vehicles_file, &self.routes_file),
            period: Period::new(self.month, self.year)?,
            out_dir: self.out_dir.clone(),
            per_page: self.per_page.max(1),
            batch: self.batch,
        })
    }

    /// Default `tracing` directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_point_at_resource_dir() {
        let cli = Cli::try_parse_from(["fleet-activity"]).unwrap();
        let settings = cli.settings().unwrap();
        assert_eq!(settings.period, Period::default());
        assert_eq!(settings.sources.vehicles, Path::new("resource").join("Base-Veiculos.xlsx"));
        assert_eq!(settings.sources.routes, Path::new("resource").join("Base Rotas.xlsx"));
        assert_eq!(settings.per_page, 10);
        assert_eq!(cli.log_directive(), "warn");
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "fleet-activity",
            "--resource-dir",
            "data",
            "--month",
            "1",
            "--year",
            "2024",
            "--batch",
            "-vv",
        ])
        .unwrap();
        let settings = cli.settings().unwrap();
        assert_eq!(settings.period.days(), 29);
        assert!(settings.batch);
        assert_eq!(settings.sources.vehicles, Path::new("data").join("Base-Veiculos.xlsx"));
        assert_eq!(cli.log_directive(), "debug");
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        let cli = Cli::try_parse_from(["fleet-activity", "--month", "12"]).unwrap();
        assert!(matches!(cli.settings(), Err(FleetError::InvalidPeriod { .. })));
    }
}
