// Entry point and high-level CLI flow.
//
// - Option [1] reads both spreadsheets for the selected month and builds the
//   activity grid (or serves demonstration data when nothing loads).
// - Option [2] changes the month/year and reloads.
// - Options [3] and [4] browse and filter the grid page by page. Browsing
//   also sorts, changes the page size and shows one vehicle-day in detail.
// - Option [5] exports the filtered grid to xlsx/csv plus JSON summaries.
// With `--batch` the tool loads, prints the first page, exports and exits.
mod config;
mod error;
mod grid;
mod loader;
mod output;
mod processor;
mod source;
mod status;
#[cfg(test)]
mod test_support;
mod types;
mod util;

use clap::Parser;
use config::{Cli, Settings};
use grid::{FleetFilter, FilterOptions, SortKey, SortOrder, PAGE_SIZES};
use once_cell::sync::Lazy;
use source::{resolve_fleet, FleetResponse, SampleSource, SpreadsheetSource};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::{FleetVehicle, Period, StatusCode};

// Loaded grid plus browsing state, kept between menu actions so the
// spreadsheets are only re-read on request.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    response: Option<FleetResponse>,
    filter: FleetFilter,
    sort_key: SortKey,
    sort_order: SortOrder,
    page: usize,
    per_page: usize,
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// `None` for a blank answer so the filter field stays unconstrained.
fn prompt_optional(label: &str) -> Option<String> {
    let answer = prompt(label);
    if answer.is_empty() {
        None
    } else {
        Some(answer)
    }
}

/// Handle option [1]: read the spreadsheets and build the grid.
fn handle_load(settings: &Settings) {
    let primary = SpreadsheetSource::new(settings.sources.clone());
    let response = resolve_fleet(&primary, &SampleSource, settings.period);
    let diag = &response.diagnostics;

    println!(
        "Processing spreadsheets... ({} vehicles, {} routes loaded for {})",
        util::format_int(diag.vehicles.accepted),
        util::format_int(diag.routes.accepted),
        settings.period
    );
    if diag.has_rejections() {
        println!(
            "Note: {} vehicle rows and {} route rows skipped (missing plate or date).",
            util::format_int(diag.vehicles.rejected),
            util::format_int(diag.routes.rejected)
        );
        output::preview_table_rows(&diag.rows(), 5);
    }
    if response.is_fallback() {
        println!("Warning: {}", response.message);
    } else {
        println!("{}", response.message);
    }
    println!();

    let mut state = app_state();
    state.response = Some(response);
    state.page = 1;
}

/// Handle option [2]: pick another month/year and reload.
fn handle_period(settings: &mut Settings) {
    let month = prompt("Month (1-12): ");
    let year = prompt("Year: ");
    let parsed = match (month.parse::<u32>(), year.parse::<i32>()) {
        (Ok(m), Ok(y)) if m >= 1 => Period::new(m - 1, y),
        _ => {
            println!("Invalid month or year.\n");
            return;
        }
    };
    match parsed {
        Ok(period) => {
            settings.period = period;
            println!();
            handle_load(settings);
        }
        Err(e) => println!("{}\n", e),
    }
}

/// Rows of the loaded grid that pass the current filter, in the current
/// sort order.
fn visible_rows(state: &AppState) -> Vec<&FleetVehicle> {
    let Some(response) = &state.response else {
        return Vec::new();
    };
    let mut rows = state.filter.apply(&response.data);
    grid::sort_fleet(&mut rows, state.sort_key, state.sort_order, response.period);
    rows
}

fn print_page(state: &AppState) {
    let Some(response) = &state.response else {
        return;
    };
    let period = response.period;
    let per_page = state.per_page;
    let rows = visible_rows(state);
    let page = grid::paginate(&rows, state.page, per_page);
    if state.filter.is_empty() {
        println!("Fleet activity for {} (R = ran)\n", period);
    } else {
        println!("Fleet activity for {} (R = ran, filtered)\n", period);
    }
    output::preview_table_rows(&grid::grid_rows(page.items, period), per_page);
    if page.total_items > 0 {
        println!(
            "Showing {}-{} of {} vehicles (page {} of {})\n",
            page.start + 1,
            page.end,
            util::format_int(page.total_items),
            page.page,
            page.total_pages
        );
    }
}

fn handle_sort() {
    let key = prompt("Sort by (id, plate, model, base, coordinator, ran): ");
    let Some(key) = SortKey::parse(&key) else {
        println!("Unknown sort column.\n");
        return;
    };
    let order = prompt("Order (asc/desc) [asc]: ");
    let Some(order) = SortOrder::parse(&order) else {
        println!("Unknown sort order.\n");
        return;
    };
    let mut state = app_state();
    state.sort_key = key;
    state.sort_order = order;
    state.page = 1;
}

fn handle_page_size() {
    let sizes: Vec<String> = PAGE_SIZES.iter().map(|n| n.to_string()).collect();
    let answer = prompt(&format!("Vehicles per page ({}): ", sizes.join(", ")));
    match answer.parse::<usize>() {
        Ok(n) if PAGE_SIZES.contains(&n) => {
            let mut state = app_state();
            state.per_page = n;
            state.page = 1;
        }
        _ => println!("Invalid page size.\n"),
    }
}

/// Route or placeholder status of one vehicle on one day.
fn handle_day_detail() {
    let id = prompt("Vehicle #: ");
    let day = prompt("Day of month: ");
    let (Ok(id), Ok(day)) = (id.parse::<usize>(), day.parse::<u32>()) else {
        println!("Invalid vehicle or day.\n");
        return;
    };
    let state = app_state();
    let Some(response) = &state.response else {
        return;
    };
    let Some(vehicle) = response.data.iter().find(|v| v.id == id) else {
        println!("No vehicle #{}.\n", id);
        return;
    };
    match grid::day_detail(vehicle, response.period, day) {
        Some(rows) => output::preview_table_rows(&rows, rows.len()),
        None => println!("Day {} is outside {}.\n", day, response.period),
    }
}

/// Handle option [3]: page through the filtered grid.
fn handle_browse() {
    loop {
        {
            let state = app_state();
            if state.response.is_none() {
                println!("Error: No data loaded. Please load the spreadsheets first (option 1).\n");
                return;
            }
            print_page(&state);
        }
        let choice = prompt("[N]ext, [P]revious, [S]ort, [R]ows per page, [D]ay detail, [B]ack: ");
        match choice.to_uppercase().as_str() {
            "N" => {
                let mut state = app_state();
                let total = visible_rows(&state).len();
                let last = total.div_ceil(state.per_page.max(1)).max(1);
                state.page = (state.page + 1).min(last);
            }
            "P" => {
                let mut state = app_state();
                state.page = state.page.saturating_sub(1).max(1);
            }
            "S" => handle_sort(),
            "R" => handle_page_size(),
            "D" => handle_day_detail(),
            "B" => {
                println!();
                return;
            }
            _ => println!("Invalid choice. Please enter N, P, S, R, D or B."),
        }
    }
}

/// Handle option [4]: set the grid filter. Blank answers mean "all".
fn handle_filter() {
    let options = {
        let state = app_state();
        match &state.response {
            Some(r) => FilterOptions::collect(&r.data),
            None => {
                println!("Error: No data loaded. Please load the spreadsheets first (option 1).\n");
                return;
            }
        }
    };
    println!("Bases: {}", options.bases.join(", "));
    println!("Coordinators: {}", options.coordinators.join(", "));
    println!("Managers: {}", options.managers.join(", "));
    println!("Contracts: {}", options.contracts.join(", "));
    println!("Categories: {}", options.categories.join(", "));
    println!("Ownership: {}", options.ownerships.join(", "));
    let filter = FleetFilter {
        plate: prompt_optional("Plate contains: "),
        home_base: prompt_optional("Base: "),
        coordinator: prompt_optional("Coordinator: "),
        manager: prompt_optional("Manager: "),
        contract_id: prompt_optional("Contract: "),
        category: prompt_optional("Category: "),
        ownership: prompt_optional("Ownership: "),
    };

    let mut state = app_state();
    let matched = state
        .response
        .as_ref()
        .map(|r| filter.apply(&r.data).len())
        .unwrap_or(0);
    println!("{} vehicles match.\n", util::format_int(matched));
    state.filter = filter;
    state.page = 1;
}

/// Handle option [5]: write the grid and summaries to `out_dir`.
///
/// - `<stem>.xlsx` and `<stem>.csv` with the filtered grid,
/// - `summary.json` and `fleet.json`,
/// - `diagnostics.csv` when rows were rejected at load time.
fn handle_export(settings: &Settings) {
    let state = app_state();
    let Some(response) = &state.response else {
        println!("Error: No data loaded. Please load the spreadsheets first (option 1).\n");
        return;
    };
    let period = response.period;
    let rows = visible_rows(&state);
    let table = output::ExportTable::from_fleet(rows.iter().copied(), period);
    let stem = output::export_file_stem(period);

    println!("Generating exports...");
    let xlsx = settings.out_dir.join(format!("{}.xlsx", stem));
    if let Err(e) = output::write_xlsx(&xlsx, &table) {
        eprintln!("Write error: {}", e);
    }
    let csv = settings.out_dir.join(format!("{}.csv", stem));
    if let Err(e) = output::write_csv_table(&csv, &table) {
        eprintln!("Write error: {}", e);
    }

    let summary = grid::fleet_summary(rows.iter().copied(), period);
    if let Err(e) = output::write_json(&settings.out_dir.join("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    if let Err(e) = output::write_json(&settings.out_dir.join("fleet.json"), response) {
        eprintln!("Write error: {}", e);
    }
    if response.diagnostics.has_rejections() {
        let path = settings.out_dir.join("diagnostics.csv");
        if let Err(e) = output::write_csv(&path, &response.diagnostics.rows()) {
            eprintln!("Write error: {}", e);
        }
    }

    println!("(Grid exported to {} and {})", xlsx.display(), csv.display());
    println!("Summary ({}):", period);
    for code in StatusCode::ALL {
        let n = summary.status_counts.get(&code).copied().unwrap_or(0);
        println!("  {:<12} {}", code.as_str(), util::format_int(n));
    }
    println!(
        "  avg utilization {}%\n",
        util::format_number(summary.avg_utilization_pct, 2)
    );
}

fn run_batch(settings: &Settings) {
    handle_load(settings);
    print_page(&app_state());
    handle_export(settings);
}

fn run_menu(mut settings: Settings) {
    loop {
        println!("Fleet Activity ({})", settings.period);
        println!("[1] Load spreadsheets");
        println!("[2] Change month/year");
        println!("[3] Browse grid");
        println!("[4] Filter grid");
        println!("[5] Export reports");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&settings),
            "2" => handle_period(&mut settings),
            "3" => {
                println!();
                handle_browse();
            }
            "4" => handle_filter(),
            "5" => handle_export(&settings),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive())))
        .init();

    let settings = match cli.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    app_state().per_page = settings.per_page;
    if settings.batch {
        run_batch(&settings);
    } else {
        run_menu(settings);
    }
    ExitCode::SUCCESS
}
