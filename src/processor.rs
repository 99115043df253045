use crate::loader::{load_routes, load_vehicles, LoadReport};
use crate::status::daily_status;
use crate::types::{DiagnosticRow, FleetVehicle, Period, RejectedRow, RouteRecord, VehicleRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locations of the two source spreadsheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub vehicles: PathBuf,
    pub routes: PathBuf,
}

impl SourcePaths {
    pub fn in_dir(dir: &Path, vehicles_file: &str, routes_file: &str) -> Self {
        SourcePaths {
            vehicles: dir.join(vehicles_file),
            routes: dir.join(routes_file),
        }
    }
}

/// Data-quality findings from one load of both sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadDiagnostics {
    pub vehicles: LoadReport,
    pub routes: LoadReport,
    pub rejected_vehicles: Vec<RejectedRow>,
    pub rejected_routes: Vec<RejectedRow>,
}

impl LoadDiagnostics {
    pub fn has_rejections(&self) -> bool {
        !self.rejected_vehicles.is_empty() || !self.rejected_routes.is_empty()
    }

    /// Rejected rows of both sources, vehicles first.
    pub fn rows(&self) -> Vec<DiagnosticRow> {
        let tag = |source: &str, rows: &[RejectedRow]| -> Vec<DiagnosticRow> {
            rows.iter()
                .map(|r| DiagnosticRow {
                    source: source.to_string(),
                    row: r.row,
                    reason: r.reason.to_string(),
                })
                .collect()
        };
        let mut out = tag("vehicles", &self.rejected_vehicles);
        out.extend(tag("routes", &self.rejected_routes));
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct FleetBuild {
    pub vehicles: Vec<FleetVehicle>,
    pub diagnostics: LoadDiagnostics,
}

/// Join vehicles with their routes for `period`. Ids start at 1 and follow
/// registry order.
pub fn build_fleet(
    vehicles: &[VehicleRecord],
    routes: &[RouteRecord],
    period: Period,
) -> Vec<FleetVehicle> {
    vehicles
        .iter()
        .enumerate()
        .map(|(idx, v)| FleetVehicle::from_record(idx + 1, v, daily_status(&v.plate, routes, period)))
        .collect()
}

/// Load both spreadsheets and build the fleet grid for `period`.
///
/// Never fails: unreadable sources load as empty, and an empty registry
/// gives an empty fleet. Whether to fall back to sample data is the
/// caller's decision.
pub fn process_fleet(paths: &SourcePaths, period: Period) -> FleetBuild {
    info!(
        vehicles = %paths.vehicles.display(),
        routes = %paths.routes.display(),
        %period,
        "processing fleet spreadsheets"
    );
    let vehicles = load_vehicles(&paths.vehicles);
    let routes = load_routes(&paths.routes);

    if vehicles.records.is_empty() {
        warn!("vehicle registry yielded no vehicles");
    }
    if routes.records.is_empty() {
        warn!("route log yielded no routes; every day will be a placeholder");
    }

    let fleet = build_fleet(&vehicles.records, &routes.records, period);
    info!(vehicles = fleet.len(), routes = routes.records.len(), "fleet built");

    FleetBuild {
        vehicles: fleet,
        diagnostics: LoadDiagnostics {
            vehicles: vehicles.report,
            routes: routes.report,
            rejected_vehicles: vehicles.rejected,
            rejected_routes: routes.rejected,
        },
    }
}
