use crate::types::{DayDetailRow, DayStatus, FleetSummary, FleetVehicle, GridRow, Period, StatusCode};
use crate::util::{average, day_key, format_percent, format_performance, percent_of};
use std::collections::{BTreeMap, BTreeSet};

/// Constraints applied to the fleet grid. `None`, `""` and `"all"` leave a
/// field unconstrained; the plate is a case-insensitive substring match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetFilter {
    pub coordinator: Option<String>,
    pub manager: Option<String>,
    pub plate: Option<String>,
    pub contract_id: Option<String>,
    pub category: Option<String>,
    pub home_base: Option<String>,
    pub ownership: Option<String>,
}

fn exact(wanted: &Option<String>, actual: &str) -> bool {
    match wanted.as_deref() {
        None | Some("") | Some("all") => true,
        Some(w) => w == actual,
    }
}

impl FleetFilter {
    pub fn is_empty(&self) -> bool {
        *self == FleetFilter::default()
    }

    pub fn matches(&self, v: &FleetVehicle) -> bool {
        let plate_ok = match self.plate.as_deref() {
            None | Some("") => true,
            Some(p) => v.plate.to_lowercase().contains(&p.to_lowercase()),
        };
        plate_ok
            && exact(&self.coordinator, &v.coordinator)
            && exact(&self.manager, &v.manager)
            && exact(&self.contract_id, &v.contract_id)
            && exact(&self.category, &v.category)
            && exact(&self.home_base, &v.home_base)
            && exact(&self.ownership, &v.ownership)
    }

    pub fn apply<'a>(&self, fleet: &'a [FleetVehicle]) -> Vec<&'a FleetVehicle> {
        fleet.iter().filter(|v| self.matches(v)).collect()
    }
}

/// Distinct non-empty values per filterable field, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub coordinators: Vec<String>,
    pub managers: Vec<String>,
    pub contracts: Vec<String>,
    pub categories: Vec<String>,
    pub bases: Vec<String>,
    pub ownerships: Vec<String>,
}

impl FilterOptions {
    pub fn collect(fleet: &[FleetVehicle]) -> Self {
        fn distinct<F: Fn(&FleetVehicle) -> &str>(fleet: &[FleetVehicle], field: F) -> Vec<String> {
            fleet
                .iter()
                .map(|v| field(v).trim())
                .filter(|s| !s.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        }
        FilterOptions {
            coordinators: distinct(fleet, |v| v.coordinator.as_str()),
            managers: distinct(fleet, |v| v.manager.as_str()),
            contracts: distinct(fleet, |v| v.contract_id.as_str()),
            categories: distinct(fleet, |v| v.category.as_str()),
            bases: distinct(fleet, |v| v.home_base.as_str()),
            ownerships: distinct(fleet, |v| v.ownership.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Plate,
    Model,
    Base,
    Coordinator,
    RanDays,
}

impl SortKey {
    /// Accepts the column names shown in the grid header, case-insensitive.
    pub fn parse(s: &str) -> Option<SortKey> {
        match s.trim().to_lowercase().as_str() {
            "id" | "#" => Some(SortKey::Id),
            "plate" => Some(SortKey::Plate),
            "model" => Some(SortKey::Model),
            "base" => Some(SortKey::Base),
            "coordinator" => Some(SortKey::Coordinator),
            "ran" | "days" => Some(SortKey::RanDays),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<SortOrder> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" | "a" => Some(SortOrder::Ascending),
            "desc" | "d" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Stable sort of the grid rows.
pub fn sort_fleet(rows: &mut [&FleetVehicle], key: SortKey, order: SortOrder, period: Period) {
    let days = period.days();
    rows.sort_by(|a, b| {
        let ord = match key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Plate => a.plate.to_lowercase().cmp(&b.plate.to_lowercase()),
            SortKey::Model => a.model.cmp(&b.model),
            SortKey::Base => a.home_base.cmp(&b.home_base),
            SortKey::Coordinator => a.coordinator.cmp(&b.coordinator),
            SortKey::RanDays => ran_days(a, days).cmp(&ran_days(b, days)),
        };
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}

/// One page of a list, plus the numbers needed for "showing x-y of n".
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// 0-based, end exclusive.
    pub start: usize,
    pub end: usize,
}

/// Slice out 1-based `page`. Out-of-range pages are clamped; a zero
/// `per_page` is treated as one item per page.
/// Page sizes offered when browsing.
pub const PAGE_SIZES: [usize; 5] = [10, 25, 50, 100, 200];

pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = ((page - 1) * per_page).min(total_items);
    let end = (start + per_page).min(total_items);
    Page {
        items: &items[start..end],
        page,
        per_page,
        total_items,
        total_pages,
        start,
        end,
    }
}

/// Ran days among the first `days` days of the vehicle's map.
pub fn ran_days(v: &FleetVehicle, days: u32) -> usize {
    v.daily_status
        .iter()
        .filter(|(k, _)| k.parse::<u32>().map(|d| d <= days).unwrap_or(false))
        .filter(|(_, s)| s.is_ran())
        .count()
}

pub fn utilization_pct(v: &FleetVehicle, days: u32) -> u32 {
    percent_of(ran_days(v, days), days as usize)
}

/// `R` for a ran day, `.` for anything else, one character per day.
pub fn day_strip(v: &FleetVehicle, period: Period) -> String {
    (1..=period.days())
        .map(|d| match v.daily_status.get(&day_key(d)) {
            Some(s) if s.is_ran() => 'R',
            _ => '.',
        })
        .collect()
}

pub fn grid_rows(rows: &[&FleetVehicle], period: Period) -> Vec<GridRow> {
    let days = period.days();
    rows.iter()
        .map(|v| GridRow {
            id: v.id,
            plate: v.plate.clone(),
            model: v.model.clone(),
            home_base: v.home_base.clone(),
            coordinator: v.coordinator.clone(),
            days: day_strip(v, period),
            ran_days: ran_days(v, days),
            utilization: format_percent(utilization_pct(v, days)),
        })
        .collect()
}

fn detail_row(field: &str, value: impl Into<String>) -> DayDetailRow {
    DayDetailRow {
        field: field.to_string(),
        value: value.into(),
    }
}

/// What happened to `v` on `day`: the route when it ran, otherwise a line
/// describing the placeholder status. `None` when the day is outside the
/// period.
pub fn day_detail(v: &FleetVehicle, period: Period, day: u32) -> Option<Vec<DayDetailRow>> {
    let date = period.date(day)?;
    let status = v.daily_status.get(&day_key(day))?;
    let mut rows = vec![
        detail_row("Plate", v.plate.as_str()),
        detail_row("Date", date.format("%d/%m/%Y").to_string()),
        detail_row("Status", status.code().as_str()),
    ];
    match status {
        DayStatus::Ran(route) => {
            rows.push(detail_row("Route ID", route.route_id.as_str()));
            rows.push(detail_row("Distance", format!("{} km", route.distance_label)));
            rows.push(detail_row("Cluster", route.cluster.as_str()));
            rows.push(detail_row("Driver", route.driver.as_str()));
            rows.push(detail_row("Modal plate", route.modal_plate.as_str()));
            rows.push(detail_row("Performance", format_performance(route.performance)));
            rows.push(detail_row("Route date", route.route_date.as_str()));
        }
        DayStatus::Idle => rows.push(detail_row("Note", "Vehicle stood idle")),
        DayStatus::Maintenance => rows.push(detail_row("Note", "Vehicle in maintenance")),
        DayStatus::Absence => rows.push(detail_row("Note", "Driver absent")),
        DayStatus::NoRoute => rows.push(detail_row("Note", "No route for this vehicle on this day")),
    }
    Some(rows)
}

pub fn fleet_summary<'a, I>(fleet: I, period: Period) -> FleetSummary
where
    I: IntoIterator<Item = &'a FleetVehicle>,
{
    let fleet: Vec<&FleetVehicle> = fleet.into_iter().collect();
    let days = period.days();
    let mut status_counts: BTreeMap<StatusCode, usize> =
        StatusCode::ALL.iter().map(|c| (*c, 0)).collect();
    for v in &fleet {
        for status in v.daily_status.values() {
            *status_counts.entry(status.code()).or_insert(0) += 1;
        }
    }
    let utilizations: Vec<f64> = fleet
        .iter()
        .map(|v| utilization_pct(v, days) as f64)
        .collect();
    let avg = average(&utilizations);
    FleetSummary {
        period: period.to_string(),
        total_vehicles: fleet.len(),
        vehicle_days: status_counts.values().sum(),
        status_counts,
        avg_utilization_pct: (avg * 100.0).round() / 100.0,
    }
}
