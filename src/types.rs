use crate::error::FleetError;
use crate::util::days_in_month;
use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tabled::Tabled;

/// Header names expected in the vehicle registry sheet.
pub mod vehicle_columns {
    pub const PLATE: &str = "Placa";
    pub const MODEL: &str = "Modelo";
    pub const CONTRACT: &str = "Contrato Meli";
    pub const CATEGORY: &str = "Categoria";
    pub const BASE: &str = "Base";
    pub const COORDINATOR: &str = "Coordenador";
    pub const MANAGER: &str = "Gerente";
    pub const OWNERSHIP: &str = "Tipo de Frota";
}

/// Header names expected in the route log sheet.
pub mod route_columns {
    pub const ROUTE_DATE: &str = "Data Rota";
    pub const PLATE: &str = "Placa";
    pub const ROUTE_ID: &str = "ID Rota";
    pub const DISTANCE: &str = "Milha";
    pub const CLUSTER: &str = "Cluster";
    pub const DRIVER: &str = "Motorista";
    pub const MODAL: &str = "Modal";
    pub const PERFORMANCE: &str = "Performance";
    pub const PLANNED_KM: &str = "KM Planejado";
}

pub const DEFAULT_OWNERSHIP: &str = "Owned";
pub const DEFAULT_PERFORMANCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRecord {
    pub plate: String,
    pub model: String,
    pub contract_id: String,
    pub category: String,
    pub home_base: String,
    pub coordinator: String,
    pub manager: String,
    pub ownership: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    /// ISO `YYYY-MM-DD` when the cell was a serial or native date; the raw
    /// text otherwise.
    pub route_date: String,
    pub plate: String,
    pub route_id: String,
    /// Not always numeric: some exports carry tags like `line_haul`.
    pub distance_label: String,
    pub cluster: String,
    pub driver: String,
    pub modal_plate: String,
    /// Ratio in 0..=1 (1.0 = 100%).
    pub performance: f64,
    pub planned_distance: String,
}

impl RouteRecord {
    /// Date portion of `route_date`, dropping any `T...` time suffix.
    pub fn day_key(&self) -> &str {
        self.route_date
            .split('T')
            .next()
            .unwrap_or(self.route_date.as_str())
    }

    pub fn detail(&self) -> RouteDetail {
        RouteDetail {
            route_id: self.route_id.clone(),
            distance_label: self.distance_label.clone(),
            cluster: self.cluster.clone(),
            driver: self.driver.clone(),
            modal_plate: self.modal_plate.clone(),
            performance: self.performance,
            route_date: self.route_date.clone(),
            planned_distance: self.planned_distance.clone(),
        }
    }
}

/// Snapshot of the route that made a vehicle count as running on a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDetail {
    pub route_id: String,
    pub distance_label: String,
    pub cluster: String,
    pub driver: String,
    pub modal_plate: String,
    pub performance: f64,
    pub route_date: String,
    pub planned_distance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCode {
    Ran,
    Idle,
    Maintenance,
    Absence,
    NoRoute,
}

impl StatusCode {
    pub const ALL: [StatusCode; 5] = [
        StatusCode::Ran,
        StatusCode::Idle,
        StatusCode::Maintenance,
        StatusCode::Absence,
        StatusCode::NoRoute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ran => "ran",
            StatusCode::Idle => "idle",
            StatusCode::Maintenance => "maintenance",
            StatusCode::Absence => "absence",
            StatusCode::NoRoute => "no-route",
        }
    }
}

/// Status of one vehicle on one calendar day. Only `Ran` carries a route.
#[derive(Debug, Clone, PartialEq)]
pub enum DayStatus {
    Ran(RouteDetail),
    Idle,
    Maintenance,
    Absence,
    NoRoute,
}

impl DayStatus {
    pub fn code(&self) -> StatusCode {
        match self {
            DayStatus::Ran(_) => StatusCode::Ran,
            DayStatus::Idle => StatusCode::Idle,
            DayStatus::Maintenance => StatusCode::Maintenance,
            DayStatus::Absence => StatusCode::Absence,
            DayStatus::NoRoute => StatusCode::NoRoute,
        }
    }

    pub fn route_detail(&self) -> Option<&RouteDetail> {
        match self {
            DayStatus::Ran(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn is_ran(&self) -> bool {
        matches!(self, DayStatus::Ran(_))
    }
}

impl Serialize for DayStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DayStatus", 2)?;
        s.serialize_field("status", &self.code())?;
        s.serialize_field("route_detail", &self.route_detail())?;
        s.end()
    }
}

/// Two-digit day of month (`"01"`..) to status.
pub type DailyStatusMap = BTreeMap<String, DayStatus>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetVehicle {
    pub id: usize,
    pub plate: String,
    pub model: String,
    pub contract_id: String,
    pub category: String,
    pub home_base: String,
    pub coordinator: String,
    pub manager: String,
    pub ownership: String,
    pub daily_status: DailyStatusMap,
}

impl FleetVehicle {
    pub fn from_record(id: usize, record: &VehicleRecord, daily_status: DailyStatusMap) -> Self {
        FleetVehicle {
            id,
            plate: record.plate.clone(),
            model: record.model.clone(),
            contract_id: record.contract_id.clone(),
            category: record.category.clone(),
            home_base: record.home_base.clone(),
            coordinator: record.coordinator.clone(),
            manager: record.manager.clone(),
            ownership: record.ownership.clone(),
            daily_status,
        }
    }
}

/// Selected month (0-indexed, like the dashboard's month picker) and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    month0: u32,
    year: i32,
}

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

impl Period {
    pub fn new(month0: u32, year: i32) -> Result<Self, FleetError> {
        if month0 > 11 || days_in_month(year, month0).is_none() {
            return Err(FleetError::InvalidPeriod { month: month0, year });
        }
        Ok(Period { month0, year })
    }

    pub fn month_number(&self) -> u32 {
        self.month0 + 1
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.month0 as usize]
    }

    /// 28..=31; validated at construction.
    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month0).unwrap_or(0)
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month_number(), day)
    }

    pub fn dates(&self) -> impl Iterator<Item = (u32, NaiveDate)> + '_ {
        (1..=self.days()).filter_map(move |day| self.date(day).map(|d| (day, d)))
    }
}

impl Default for Period {
    fn default() -> Self {
        Period { month0: 6, year: 2025 }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month_number(), self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingPlate,
    MissingRouteDate,
    MissingPlateAndDate,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::MissingPlate => "missing plate",
            RejectReason::MissingRouteDate => "missing route date",
            RejectReason::MissingPlateAndDate => "missing plate and route date",
        };
        f.write_str(s)
    }
}

/// A data row that was dropped at load time. `row` is the 1-based sheet row
/// as the spreadsheet shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Tabled)]
pub struct GridRow {
    #[tabled(rename = "#")]
    pub id: usize,
    #[tabled(rename = "Plate")]
    pub plate: String,
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "Base")]
    pub home_base: String,
    #[tabled(rename = "Coordinator")]
    pub coordinator: String,
    #[tabled(rename = "Days")]
    pub days: String,
    #[tabled(rename = "Ran")]
    pub ran_days: usize,
    #[tabled(rename = "Utilization")]
    pub utilization: String,
}

/// One line of the day detail view.
#[derive(Debug, Clone, Tabled)]
pub struct DayDetailRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// A rejected row flattened for the diagnostics export.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct DiagnosticRow {
    #[serde(rename = "Source")]
    #[tabled(rename = "Source")]
    pub source: String,
    #[serde(rename = "Row")]
    #[tabled(rename = "Row")]
    pub row: usize,
    #[serde(rename = "Reason")]
    #[tabled(rename = "Reason")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub period: String,
    pub total_vehicles: usize,
    pub vehicle_days: usize,
    pub status_counts: BTreeMap<StatusCode, usize>,
    pub avg_utilization_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_month_twelve() {
        assert!(matches!(
            Period::new(12, 2025),
            Err(FleetError::InvalidPeriod { month: 12, year: 2025 })
        ));
    }

    #[test]
    fn period_days_follow_the_calendar() {
        assert_eq!(Period::new(1, 2024).unwrap().days(), 29);
        assert_eq!(Period::new(1, 2023).unwrap().days(), 28);
        assert_eq!(Period::new(3, 2025).unwrap().days(), 30);
        assert_eq!(Period::new(11, 2025).unwrap().days(), 31);
        assert_eq!(Period::default().to_string(), "07/2025");
    }

    #[test]
    fn day_key_strips_time_suffix() {
        let route = RouteRecord {
            route_date: "2025-07-15T08:30:00".into(),
            plate: "ABC-1234".into(),
            route_id: "R1".into(),
            distance_label: String::new(),
            cluster: String::new(),
            driver: String::new(),
            modal_plate: String::new(),
            performance: 1.0,
            planned_distance: String::new(),
        };
        assert_eq!(route.day_key(), "2025-07-15");
    }

    #[test]
    fn day_status_serializes_detail_only_when_ran() {
        let idle = serde_json::to_value(DayStatus::Idle).unwrap();
        assert_eq!(idle["status"], "idle");
        assert!(idle["route_detail"].is_null());

        let no_route = serde_json::to_value(DayStatus::NoRoute).unwrap();
        assert_eq!(no_route["status"], "no-route");

        let ran = DayStatus::Ran(RouteDetail {
            route_id: "R1".into(),
            distance_label: "line_haul".into(),
            cluster: "Norte".into(),
            driver: "Ana".into(),
            modal_plate: "XYZ-0001".into(),
            performance: 0.95,
            route_date: "2025-07-15".into(),
            planned_distance: "120".into(),
        });
        let ran = serde_json::to_value(ran).unwrap();
        assert_eq!(ran["status"], "ran");
        assert_eq!(ran["route_detail"]["route_id"], "R1");
    }
}
