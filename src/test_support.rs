// Fixture builders shared by the unit tests.
use crate::types::{RouteRecord, VehicleRecord};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub enum Cell {
    S(&'static str),
    N(f64),
    /// A serial day written with a date number format.
    D(f64),
    Blank,
}

/// Write `rows` into the first sheet of a fresh workbook at `path`.
pub fn write_workbook(path: &Path, rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match *cell {
                Cell::S(s) => {
                    sheet.write_string(r as u32, c as u16, s).unwrap();
                }
                Cell::N(n) => {
                    sheet.write_number(r as u32, c as u16, n).unwrap();
                }
                Cell::D(n) => {
                    sheet
                        .write_number_with_format(r as u32, c as u16, n, &date_format)
                        .unwrap();
                }
                Cell::Blank => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

pub fn write_text(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

pub fn vehicle(plate: &str) -> VehicleRecord {
    VehicleRecord {
        plate: plate.to_string(),
        model: "Mercedes Sprinter 415".into(),
        contract_id: "CT-001".into(),
        category: "Van".into(),
        home_base: "Base Central SP".into(),
        coordinator: "João Silva".into(),
        manager: "Ana Paula".into(),
        ownership: "Owned".into(),
    }
}

pub fn route(plate: &str, date: &str, route_id: &str) -> RouteRecord {
    RouteRecord {
        route_date: date.to_string(),
        plate: plate.to_string(),
        route_id: route_id.to_string(),
        distance_label: "line_haul".into(),
        cluster: "Norte".into(),
        driver: "Carlos".into(),
        modal_plate: "XYZ-0001".into(),
        performance: 0.95,
        planned_distance: "120".into(),
    }
}
