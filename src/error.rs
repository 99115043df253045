use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading a source spreadsheet and
/// writing an export.
///
/// The ETL entry points (`loader::load_*`, `processor::process_fleet`) never
/// return these; they log and collapse to an empty result instead. The
/// `try_*` variants and the export writers surface them.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {}: {source}", .path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook {} has no sheets", .0.display())]
    EmptyWorkbook(PathBuf),

    #[error("failed to parse csv {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid period: month {month} (expected 0-11) of year {year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("xlsx export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv export failed: {0}")]
    CsvWrite(#[from] csv::Error),

    #[error("json export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
