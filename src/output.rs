use crate::error::Result;
use crate::grid::{ran_days, utilization_pct};
use crate::types::{FleetVehicle, Period};
use crate::util::{day_key, format_percent};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub const EXPORT_SHEET_NAME: &str = "Fleet Activity";
pub const RAN_LABEL: &str = "Ran";
pub const NOT_RAN_LABEL: &str = "Did not run";

const FIXED_HEADERS: [&str; 8] = [
    "Plate",
    "Model",
    "Contract",
    "Category",
    "Base",
    "Coordinator",
    "Manager",
    "Ownership",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Text(String),
    Count(usize),
}

impl ExportCell {
    fn as_text(&self) -> String {
        match self {
            ExportCell::Text(s) => s.clone(),
            ExportCell::Count(n) => n.to_string(),
        }
    }
}

/// The activity grid flattened to rows and columns, shared by the xlsx and
/// csv writers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ExportCell>>,
}

impl ExportTable {
    pub fn from_fleet<'a, I>(fleet: I, period: Period) -> Self
    where
        I: IntoIterator<Item = &'a FleetVehicle>,
    {
        let days = period.days();
        let mut headers: Vec<String> = FIXED_HEADERS.iter().map(|h| h.to_string()).collect();
        headers.extend((1..=days).map(|d| format!("{}/{:02}", day_key(d), period.month_number())));
        headers.push("Total Days".to_string());
        headers.push("Percentage".to_string());

        let rows = fleet
            .into_iter()
            .map(|v| {
                let mut row: Vec<ExportCell> = [
                    &v.plate,
                    &v.model,
                    &v.contract_id,
                    &v.category,
                    &v.home_base,
                    &v.coordinator,
                    &v.manager,
                    &v.ownership,
                ]
                .iter()
                .map(|s| ExportCell::Text(s.to_string()))
                .collect();
                for d in 1..=days {
                    let ran = v
                        .daily_status
                        .get(&day_key(d))
                        .map(|s| s.is_ran())
                        .unwrap_or(false);
                    let label = if ran { RAN_LABEL } else { NOT_RAN_LABEL };
                    row.push(ExportCell::Text(label.to_string()));
                }
                row.push(ExportCell::Count(ran_days(v, days)));
                row.push(ExportCell::Text(format_percent(utilization_pct(v, days))));
                row
            })
            .collect();

        ExportTable { headers, rows }
    }
}

/// `fleet-activity-july-2025`; callers add the extension.
pub fn export_file_stem(period: Period) -> String {
    format!("fleet-activity-{}-{}", period.month_name(), period.year())
}

pub fn write_xlsx(path: &Path, table: &ExportTable) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME)?;

    for (c, h) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, h.as_str(), &header_format)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (c, cell) in row.iter().enumerate() {
            match cell {
                ExportCell::Text(s) => {
                    sheet.write_string(r, c as u16, s.as_str())?;
                }
                ExportCell::Count(n) => {
                    sheet.write_number(r, c as u16, *n as f64)?;
                }
            }
        }
    }
    sheet.set_freeze_panes(1, 1)?;
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 24)?;

    workbook.save(path)?;
    Ok(())
}

pub fn write_csv_table(path: &Path, table: &ExportTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(ExportCell::as_text))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::build_fleet;
    use crate::test_support::{route, vehicle};
    use calamine::{open_workbook_auto, Data, Reader};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn table() -> ExportTable {
        let period = Period::new(1, 2024).unwrap();
        let fleet = build_fleet(
            &[vehicle("ABC-1234")],
            &[
                route("ABC-1234", "2024-02-01", "R1"),
                route("ABC-1234", "2024-02-29", "R2"),
            ],
            period,
        );
        ExportTable::from_fleet(&fleet, period)
    }

    #[test]
    fn headers_cover_every_day_of_the_month() {
        let t = table();
        assert_eq!(t.headers.len(), 8 + 29 + 2);
        assert_eq!(t.headers[8], "01/02");
        assert_eq!(t.headers[36], "29/02");
        assert_eq!(t.headers[37], "Total Days");
        assert_eq!(t.headers[38], "Percentage");
    }

    #[test]
    fn rows_carry_labels_and_totals() {
        let t = table();
        let row = &t.rows[0];
        assert_eq!(row[0], ExportCell::Text("ABC-1234".into()));
        assert_eq!(row[8], ExportCell::Text("Ran".into()));
        assert_eq!(row[9], ExportCell::Text("Did not run".into()));
        assert_eq!(row[36], ExportCell::Text("Ran".into()));
        assert_eq!(row[37], ExportCell::Count(2));
        // 2 / 29 days
        assert_eq!(row[38], ExportCell::Text("7%".into()));
    }

    #[test]
    fn file_stem_uses_month_name() {
        assert_eq!(export_file_stem(Period::default()), "fleet-activity-july-2025");
        assert_eq!(
            export_file_stem(Period::new(1, 2024).unwrap()),
            "fleet-activity-february-2024"
        );
    }

    #[test]
    fn xlsx_export_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.xlsx");
        write_xlsx(&path, &table()).unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec![EXPORT_SHEET_NAME.to_string()]);
        let range = wb.worksheet_range(EXPORT_SHEET_NAME).unwrap();
        assert_eq!(range.get_size(), (2, 39));
        assert_eq!(range.get((0, 0)), Some(&Data::String("Plate".into())));
        assert_eq!(range.get((1, 0)), Some(&Data::String("ABC-1234".into())));
        assert_eq!(range.get((1, 37)), Some(&Data::Float(2.0)));
    }

    #[test]
    fn csv_export_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        write_csv_table(&path, &table()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Plate,Model,Contract"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("ABC-1234,Mercedes Sprinter 415"));
        assert!(row.ends_with(",2,7%"));
    }

    #[test]
    fn json_writer_pretty_prints() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({ "vehicles": 2 })).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"vehicles\": 2"));
    }
}
