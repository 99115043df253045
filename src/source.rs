// Where fleet data comes from.
//
// The spreadsheet source is the real one; the sample source is a fixed
// two-vehicle demo set. `resolve_fleet` picks between them and tags the
// response so consumers can tell demo data from loaded data.
use crate::processor::{process_fleet, FleetBuild, LoadDiagnostics, SourcePaths};
use crate::status::lcg_unit;
use crate::types::{DailyStatusMap, DayStatus, FleetVehicle, Period, RouteDetail, VehicleRecord};
use crate::util::{day_key, iso_date};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Spreadsheet,
    Fallback,
}

pub trait FleetSource {
    fn origin(&self) -> DataOrigin;
    fn fetch(&self, period: Period) -> FleetBuild;
}

/// Reads the vehicle registry and route log from disk on every fetch.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    pub paths: SourcePaths,
}

impl SpreadsheetSource {
    pub fn new(paths: SourcePaths) -> Self {
        SpreadsheetSource { paths }
    }
}

impl FleetSource for SpreadsheetSource {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Spreadsheet
    }

    fn fetch(&self, period: Period) -> FleetBuild {
        process_fleet(&self.paths, period)
    }
}

/// Fixed demonstration fleet with synthetic statuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSource;

const SAMPLE_CLUSTERS: [&str; 5] = ["Norte", "Sul", "Leste", "Oeste", "Centro"];

fn sample_records() -> [VehicleRecord; 2] {
    [
        VehicleRecord {
            plate: "ABC-1234".into(),
            model: "Mercedes Sprinter 415".into(),
            contract_id: "CT-001-MELI".into(),
            category: "Van".into(),
            home_base: "Base Central SP".into(),
            coordinator: "João Silva".into(),
            manager: "Ana Paula Rodrigues".into(),
            ownership: "Owned".into(),
        },
        VehicleRecord {
            plate: "DEF-5678".into(),
            model: "Volkswagen Crafter".into(),
            contract_id: "CT-002-MELI".into(),
            category: "Truck".into(),
            home_base: "Base Norte RJ".into(),
            coordinator: "Maria Oliveira".into(),
            manager: "Roberto Mendes".into(),
            ownership: "Outsourced".into(),
        },
    ]
}

fn sample_route(vehicle_id: u64, day: u32, r: f64, date: NaiveDate) -> RouteDetail {
    let distance = ((r * 150.0 + 50.0) * 10.0).round() / 10.0;
    let cluster = SAMPLE_CLUSTERS[((r * 5.0).floor() as usize).min(SAMPLE_CLUSTERS.len() - 1)];
    RouteDetail {
        route_id: format!("R{:03}", vehicle_id * 13 + u64::from(day)),
        distance_label: distance.to_string(),
        cluster: cluster.to_string(),
        driver: format!("Driver {}", (r * 50.0).floor() as u64 + 1),
        modal_plate: format!("PLM{:04}", (r * 9999.0).floor() as u64),
        // Tenths of a percent, stored as a 0-1 ratio.
        performance: ((r * 30.0 + 70.0) * 10.0).round() / 1000.0,
        route_date: iso_date(date),
        planned_distance: String::new(),
    }
}

pub fn sample_status(vehicle_id: usize, period: Period) -> DailyStatusMap {
    let id = vehicle_id as u64;
    period
        .dates()
        .map(|(day, date)| {
            let r = lcg_unit(id * 100 + u64::from(day));
            let status = if r < 0.55 {
                DayStatus::Ran(sample_route(id, day, r, date))
            } else if r < 0.65 {
                DayStatus::Idle
            } else if r < 0.75 {
                DayStatus::Maintenance
            } else if r < 0.85 {
                DayStatus::Absence
            } else {
                DayStatus::NoRoute
            };
            (day_key(day), status)
        })
        .collect()
}

impl FleetSource for SampleSource {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Fallback
    }

    fn fetch(&self, period: Period) -> FleetBuild {
        let vehicles = sample_records()
            .iter()
            .enumerate()
            .map(|(idx, record)| FleetVehicle::from_record(idx + 1, record, sample_status(idx + 1, period)))
            .collect();
        FleetBuild {
            vehicles,
            diagnostics: LoadDiagnostics::default(),
        }
    }
}

/// Fleet data as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct FleetResponse {
    pub success: bool,
    pub source: DataOrigin,
    pub message: String,
    pub period: Period,
    pub data: Vec<FleetVehicle>,
    /// Findings from the primary source, even when the fallback was used.
    pub diagnostics: LoadDiagnostics,
}

impl FleetResponse {
    pub fn is_fallback(&self) -> bool {
        self.source == DataOrigin::Fallback
    }
}

/// Fetch from `primary`; when it yields no vehicles, serve `fallback` instead.
pub fn resolve_fleet(
    primary: &dyn FleetSource,
    fallback: &dyn FleetSource,
    period: Period,
) -> FleetResponse {
    let build = primary.fetch(period);
    if !build.vehicles.is_empty() {
        info!(vehicles = build.vehicles.len(), %period, "serving spreadsheet data");
        return FleetResponse {
            success: true,
            source: primary.origin(),
            message: format!(
                "{} vehicles loaded from spreadsheets for {}",
                build.vehicles.len(),
                period
            ),
            period,
            data: build.vehicles,
            diagnostics: build.diagnostics,
        };
    }

    warn!(%period, "no vehicles loaded, serving demonstration data");
    let sample = fallback.fetch(period);
    FleetResponse {
        success: true,
        source: fallback.origin(),
        message: "Using demonstration data (spreadsheets not loaded)".to_string(),
        period,
        data: sample.vehicles,
        diagnostics: build.diagnostics,
    }
}
