use crate::error::{FleetError, Result};
use crate::types::{
    route_columns, vehicle_columns, RejectReason, RejectedRow, RouteRecord, VehicleRecord,
    DEFAULT_OWNERSHIP, DEFAULT_PERFORMANCE,
};
use crate::util::{normalize_date, normalize_number, normalize_text, CellValue};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Records that survived loading plus the rows that did not.
#[derive(Debug, Clone)]
pub struct LoadOutcome<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
    pub report: LoadReport,
}

impl<T> Default for LoadOutcome<T> {
    fn default() -> Self {
        LoadOutcome {
            records: Vec::new(),
            rejected: Vec::new(),
            report: LoadReport::default(),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A non-blank data row of the first sheet, keyed by header text.
#[derive(Debug, Clone)]
pub struct SheetRow {
    /// 1-based row number as the spreadsheet shows it.
    pub number: usize,
    cells: HashMap<String, CellValue>,
}

impl SheetRow {
    pub fn get(&self, header: &str) -> &CellValue {
        self.cells.get(header).unwrap_or(&EMPTY_CELL)
    }
}

/// Read the first sheet of `path` into header-keyed rows.
///
/// The whole file is read into memory before parsing so a file held open
/// by another process is never read partially. `.csv` goes through the csv
/// reader, everything else through calamine's format sniffing.
pub fn read_sheet(path: &Path) -> Result<Vec<SheetRow>> {
    if !path.is_file() {
        return Err(FleetError::MissingSource(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| FleetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (first_row, grid) = if is_csv(path) {
        (0, csv_grid(path, &bytes)?)
    } else {
        workbook_grid(path, bytes)?
    };
    let rows = rows_from_grid(path, first_row, grid);
    debug!(path = %path.display(), rows = rows.len(), "sheet read");
    Ok(rows)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn csv_grid(path: &Path, bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| FleetError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        grid.push(record.iter().map(CellValue::from).collect());
    }
    Ok(grid)
}

/// Cells of the first sheet plus the 0-based sheet row the used range
/// starts at. Blank title rows above the header are not part of the range.
fn workbook_grid(path: &Path, bytes: Vec<u8>) -> Result<(usize, Vec<Vec<CellValue>>)> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|source| FleetError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FleetError::EmptyWorkbook(path.to_path_buf()))?
        .map_err(|source| FleetError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let grid = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok((first_row, grid))
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Date-formatted cells go through calamine, which knows about 1904
        // workbooks. Durations and out-of-range values keep the raw serial.
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(when) if dt.is_datetime() => CellValue::Date(when.date()),
            _ => CellValue::Number(dt.as_f64()),
        },
    }
}

fn rows_from_grid(path: &Path, first_row: usize, grid: Vec<Vec<CellValue>>) -> Vec<SheetRow> {
    let mut lines = grid.into_iter();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header
        .iter()
        .map(|c| normalize_text(c).trim_start_matches('\u{feff}').to_string())
        .collect();
    debug!(path = %path.display(), columns = ?headers, "sheet headers");

    lines
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(CellValue::is_blank))
        .map(|(idx, cells)| {
            let mut map = HashMap::with_capacity(headers.len());
            for (h, c) in headers.iter().zip(cells) {
                if !h.is_empty() {
                    // First occurrence of a duplicated header wins.
                    map.entry(h.clone()).or_insert(c);
                }
            }
            SheetRow {
                number: first_row + idx + 2,
                cells: map,
            }
        })
        .collect()
}

fn collect_rows<T, F>(rows: Vec<SheetRow>, convert: F) -> LoadOutcome<T>
where
    F: Fn(&SheetRow) -> std::result::Result<T, RejectReason>,
{
    let total_rows = rows.len();
    let mut records = Vec::with_capacity(total_rows);
    let mut rejected = Vec::new();
    for row in &rows {
        match convert(row) {
            Ok(r) => records.push(r),
            Err(reason) => rejected.push(RejectedRow {
                row: row.number,
                reason,
            }),
        }
    }
    let report = LoadReport {
        total_rows,
        accepted: records.len(),
        rejected: rejected.len(),
    };
    LoadOutcome {
        records,
        rejected,
        report,
    }
}

pub fn vehicle_from_row(row: &SheetRow) -> std::result::Result<VehicleRecord, RejectReason> {
    use vehicle_columns as c;
    let plate = normalize_text(row.get(c::PLATE));
    if plate.is_empty() {
        return Err(RejectReason::MissingPlate);
    }
    let ownership = normalize_text(row.get(c::OWNERSHIP));
    Ok(VehicleRecord {
        plate,
        model: normalize_text(row.get(c::MODEL)),
        contract_id: normalize_text(row.get(c::CONTRACT)),
        category: normalize_text(row.get(c::CATEGORY)),
        home_base: normalize_text(row.get(c::BASE)),
        coordinator: normalize_text(row.get(c::COORDINATOR)),
        manager: normalize_text(row.get(c::MANAGER)),
        ownership: if ownership.is_empty() {
            DEFAULT_OWNERSHIP.to_string()
        } else {
            ownership
        },
    })
}

pub fn route_from_row(row: &SheetRow) -> std::result::Result<RouteRecord, RejectReason> {
    use route_columns as c;
    let plate = normalize_text(row.get(c::PLATE));
    // Trimmed here rather than in normalize_date so stray spaces around a
    // text date do not block the day match.
    let route_date = normalize_date(row.get(c::ROUTE_DATE)).trim().to_string();
    match (plate.is_empty(), route_date.is_empty()) {
        (true, true) => return Err(RejectReason::MissingPlateAndDate),
        (true, false) => return Err(RejectReason::MissingPlate),
        (false, true) => return Err(RejectReason::MissingRouteDate),
        (false, false) => {}
    }
    // Blank, unparseable and zero all read as full performance.
    let performance = match normalize_number(row.get(c::PERFORMANCE)) {
        p if p == 0.0 => DEFAULT_PERFORMANCE,
        p => p,
    };
    Ok(RouteRecord {
        route_date,
        plate,
        route_id: normalize_text(row.get(c::ROUTE_ID)),
        distance_label: normalize_text(row.get(c::DISTANCE)),
        cluster: normalize_text(row.get(c::CLUSTER)),
        driver: normalize_text(row.get(c::DRIVER)),
        modal_plate: normalize_text(row.get(c::MODAL)),
        performance,
        planned_distance: normalize_text(row.get(c::PLANNED_KM)),
    })
}

pub fn try_load_vehicles(path: &Path) -> Result<LoadOutcome<VehicleRecord>> {
    info!(path = %path.display(), "reading vehicle registry");
    let outcome = collect_rows(read_sheet(path)?, vehicle_from_row);
    info!(
        total = outcome.report.total_rows,
        accepted = outcome.report.accepted,
        rejected = outcome.report.rejected,
        "vehicle registry loaded"
    );
    Ok(outcome)
}

pub fn try_load_routes(path: &Path) -> Result<LoadOutcome<RouteRecord>> {
    info!(path = %path.display(), "reading route log");
    let outcome = collect_rows(read_sheet(path)?, route_from_row);
    info!(
        total = outcome.report.total_rows,
        accepted = outcome.report.accepted,
        rejected = outcome.report.rejected,
        "route log loaded"
    );
    Ok(outcome)
}

/// Like [`try_load_vehicles`], but a missing or unreadable file yields an
/// empty outcome.
pub fn load_vehicles(path: &Path) -> LoadOutcome<VehicleRecord> {
    absorb(try_load_vehicles(path), "vehicle registry")
}

/// Like [`try_load_routes`], but a missing or unreadable file yields an
/// empty outcome.
pub fn load_routes(path: &Path) -> LoadOutcome<RouteRecord> {
    absorb(try_load_routes(path), "route log")
}

fn absorb<T>(result: Result<LoadOutcome<T>>, what: &str) -> LoadOutcome<T> {
    match result {
        Ok(outcome) => outcome,
        Err(e @ FleetError::MissingSource(_)) => {
            warn!(error = %e, "{} unavailable", what);
            LoadOutcome::default()
        }
        Err(e) => {
            error!(error = %e, "failed to load {}", what);
            LoadOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_text, write_workbook, Cell};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const VEHICLE_HEADERS: [&str; 8] = [
        "Placa",
        "Modelo",
        "Contrato Meli",
        "Categoria",
        "Base",
        "Coordenador",
        "Gerente",
        "Tipo de Frota",
    ];

    #[test]
    fn vehicles_from_workbook_drop_blank_plates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Base-Veiculos.xlsx");
        let header: Vec<Cell> = VEHICLE_HEADERS.iter().map(|h| Cell::S(*h)).collect();
        write_workbook(
            &path,
            &[
                header,
                vec![
                    Cell::S(" ABC-1234 "),
                    Cell::S("Mercedes Sprinter 415"),
                    Cell::S("CT-001"),
                    Cell::S("Van"),
                    Cell::S("Base Central SP"),
                    Cell::S("João Silva"),
                    Cell::S("Ana Paula"),
                    Cell::Blank,
                ],
                vec![
                    Cell::Blank,
                    Cell::S("Orphan model"),
                    Cell::S("CT-009"),
                ],
                vec![
                    Cell::S("DEF-5678"),
                    Cell::S("Volkswagen Crafter"),
                    Cell::N(2.0),
                    Cell::S("Truck"),
                    Cell::S("Base Norte RJ"),
                    Cell::S("Maria"),
                    Cell::S("Roberto"),
                    Cell::S("Outsourced"),
                ],
            ],
        );

        let outcome = try_load_vehicles(&path).unwrap();
        let plates: Vec<&str> = outcome.records.iter().map(|v| v.plate.as_str()).collect();
        assert_eq!(plates, vec!["ABC-1234", "DEF-5678"]);
        assert_eq!(outcome.records[0].ownership, "Owned");
        assert_eq!(outcome.records[0].coordinator, "João Silva");
        assert_eq!(outcome.records[1].contract_id, "2");
        assert_eq!(outcome.records[1].ownership, "Outsourced");
        assert_eq!(
            outcome.rejected,
            vec![RejectedRow {
                row: 3,
                reason: RejectReason::MissingPlate
            }]
        );
        assert_eq!(
            outcome.report,
            LoadReport {
                total_rows: 3,
                accepted: 2,
                rejected: 1
            }
        );
    }

    #[test]
    fn routes_from_workbook_decode_serial_dates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Base Rotas.xlsx");
        write_workbook(
            &path,
            &[
                vec![
                    Cell::S("Data Rota"),
                    Cell::S("Placa"),
                    Cell::S("ID Rota"),
                    Cell::S("Milha"),
                    Cell::S("Cluster"),
                    Cell::S("Motorista"),
                    Cell::S("Modal"),
                    Cell::S("Performance"),
                    Cell::S("KM Planejado"),
                ],
                vec![
                    Cell::N(45853.0),
                    Cell::S("ABC-1234"),
                    Cell::S("R1"),
                    Cell::S("line_haul"),
                    Cell::S("Norte"),
                    Cell::S("Carlos"),
                    Cell::S("XYZ-0001"),
                    Cell::N(0.95),
                    Cell::N(120.0),
                ],
                vec![
                    Cell::S("2025-07-16"),
                    Cell::S("ABC-1234"),
                    Cell::S("R2"),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::S("n/a"),
                ],
                vec![Cell::Blank, Cell::S("ABC-1234"), Cell::S("R3")],
                vec![Cell::N(45854.0), Cell::Blank, Cell::S("R4")],
            ],
        );

        let outcome = try_load_routes(&path).unwrap();
        assert_eq!(outcome.records.len(), 2);
        let first = &outcome.records[0];
        assert_eq!(first.route_date, "2025-07-15");
        assert_eq!(first.distance_label, "line_haul");
        assert_eq!(first.performance, 0.95);
        assert_eq!(first.planned_distance, "120");
        assert_eq!(outcome.records[1].performance, 1.0);
        let reasons: Vec<RejectReason> = outcome.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![RejectReason::MissingRouteDate, RejectReason::MissingPlate]
        );
    }

    #[test]
    fn row_numbers_follow_the_sheet_when_title_rows_are_blank() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Base-Veiculos.xlsx");
        write_workbook(
            &path,
            &[
                vec![],
                vec![],
                vec![Cell::S("Placa"), Cell::S("Modelo")],
                vec![Cell::S("ABC-1234"), Cell::S("Sprinter")],
                vec![Cell::Blank, Cell::S("No plate")],
            ],
        );

        let outcome = try_load_vehicles(&path).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.rejected,
            vec![RejectedRow {
                row: 5,
                reason: RejectReason::MissingPlate
            }]
        );
    }

    #[test]
    fn date_formatted_cells_become_dates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Base Rotas.xlsx");
        write_workbook(
            &path,
            &[
                vec![Cell::S("Data Rota"), Cell::S("Placa")],
                vec![Cell::D(45853.0), Cell::S("ABC-1234")],
                vec![Cell::D(45854.5), Cell::S("ABC-1234")],
            ],
        );

        let outcome = try_load_routes(&path).unwrap();
        let dates: Vec<&str> = outcome.records.iter().map(|r| r.route_date.as_str()).collect();
        assert_eq!(dates, vec!["2025-07-15", "2025-07-16"]);
    }

    #[test]
    fn csv_exports_are_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.csv");
        write_text(
            &path,
            "Data Rota,Placa,ID Rota,Performance\n\
             2025-07-15T06:00:00,abc-1234,R1,0.8\n\
             ,,,\n\
             2025-07-20,  ,R2,\n",
        );

        let outcome = try_load_routes(&path).unwrap();
        assert_eq!(outcome.report.total_rows, 2);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].route_date, "2025-07-15T06:00:00");
        assert_eq!(outcome.records[0].plate, "abc-1234");
        assert_eq!(outcome.rejected[0].row, 4);
    }

    #[test]
    fn padded_text_dates_are_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.csv");
        write_text(&path, "Data Rota,Placa\n  2025-07-15 ,ABC-1234\n");
        let outcome = try_load_routes(&path).unwrap();
        assert_eq!(outcome.records[0].route_date, "2025-07-15");
    }

    #[test]
    fn missing_file_is_absorbed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.xlsx");
        assert!(matches!(
            try_load_vehicles(&path),
            Err(FleetError::MissingSource(_))
        ));
        let outcome = load_vehicles(&path);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report, LoadReport::default());
    }

    #[test]
    fn corrupt_workbook_is_absorbed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        write_text(&path, "this is not a workbook");
        assert!(matches!(
            try_load_routes(&path),
            Err(FleetError::Workbook { .. })
        ));
        assert!(load_routes(&path).records.is_empty());
    }

    #[test]
    fn header_only_sheet_has_no_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vehicles.csv");
        write_text(&path, "Placa,Modelo\n");
        let outcome = try_load_vehicles(&path).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.total_rows, 0);
    }
}
