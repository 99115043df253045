// Per-day activity status for one vehicle over a month.
//
// A day with a matching route record is `Ran`. Every other day gets a
// placeholder status drawn from a fixed linear-congruential step, so the
// same plate initial and day always produce the same answer.
use crate::types::{DailyStatusMap, DayStatus, Period, RouteRecord};
use crate::util::{day_key, is_weekend, iso_date};
use chrono::{Datelike, NaiveDate};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

/// One LCG step mapped into `[0, 1)`.
pub fn lcg_unit(seed: u64) -> f64 {
    ((seed * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS) as f64 / LCG_MODULUS as f64
}

/// Placeholder status for a day without a route.
///
/// Seeded by the first UTF-16 unit of the plate plus the day of month.
/// Weekends lean towards idle; weekdays mostly show no route.
pub fn placeholder_status(plate: &str, date: NaiveDate) -> DayStatus {
    let Some(initial) = plate.encode_utf16().next() else {
        return DayStatus::NoRoute;
    };
    let r = lcg_unit(u64::from(initial) + u64::from(date.day()));
    if is_weekend(date) {
        return if r < 0.7 {
            DayStatus::Idle
        } else {
            DayStatus::NoRoute
        };
    }
    if r < 0.10 {
        DayStatus::Maintenance
    } else if r < 0.15 {
        DayStatus::Idle
    } else if r < 0.18 {
        DayStatus::Absence
    } else {
        DayStatus::NoRoute
    }
}

fn same_plate(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Status for every day of `period` for the vehicle with `plate`.
///
/// Routes are matched on plate (trimmed, case-insensitive) and on the date
/// portion of `route_date`. The first matching record of a day wins.
pub fn daily_status(plate: &str, routes: &[RouteRecord], period: Period) -> DailyStatusMap {
    let vehicle_routes: Vec<&RouteRecord> = routes
        .iter()
        .filter(|r| same_plate(&r.plate, plate))
        .collect();

    period
        .dates()
        .map(|(day, date)| {
            let iso = iso_date(date);
            let status = match vehicle_routes.iter().find(|r| r.day_key() == iso) {
                Some(route) => DayStatus::Ran(route.detail()),
                None => placeholder_status(plate, date),
            };
            (day_key(day), status)
        })
        .collect()
}
