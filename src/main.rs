// Entry point and high-level CLI flow.
//
// - Option [1] loads the three exports once and classifies them.
// - Options [2]-[4] prompt for a selection, print the view and export its
//   tables to the export directory.
// - After each view the user can go back to the menu or exit.
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use regional_sales::aggregate;
use regional_sales::dashboard::{self, CustomerView, Selection, TrendRequest};
use regional_sales::loader::{self, DatasetKind};
use regional_sales::output;
use regional_sales::util;
use regional_sales::{Dataset, RegionFilter, RegionLabel, RegionTable, Result};

#[derive(Parser)]
#[command(name = "regional-sales")]
#[command(
    about = "Regional sales dashboard: tonnage by region, deltas and customer/material drill-downs"
)]
struct Args {
    /// Directory holding the CSV exports
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Region table as JSON (`{"LAGOS": ["Lagos"], ...}`); built-in table if omitted
    #[arg(short, long)]
    regions: Option<PathBuf>,

    /// Directory the report CSV/JSON files are written to
    #[arg(short, long, default_value = ".")]
    export_dir: PathBuf,

    #[arg(long, default_value = "df2.csv")]
    regional_file: String,

    #[arg(long, default_value = "df_customers.csv")]
    customers_file: String,

    #[arg(long, default_value = "df3.csv")]
    materials_file: String,
}

struct AppState {
    table: RegionTable,
    regional: Option<Dataset>,
    customers: Option<Dataset>,
    materials: Option<Dataset>,
}

/// One trimmed answer, or `None` once the input is exhausted or broken.
fn read_answer<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ends the program at end of input, since no further answer can arrive.
fn prompt(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    match read_answer(&mut io::stdin().lock()) {
        Some(answer) => answer,
        None => {
            println!("\nExiting the program.");
            std::process::exit(0);
        }
    }
}

/// Prompt with a default that is used when the answer is empty.
fn prompt_or(label: &str, default: &str) -> String {
    let answer = prompt(&format!("{} [{}]", label, default));
    if answer.is_empty() {
        default.to_string()
    } else {
        answer
    }
}

fn prompt_number(label: &str, default: i32) -> i32 {
    loop {
        match prompt_or(label, &default.to_string()).parse() {
            Ok(v) => return v,
            Err(_) => println!("Please enter a whole number."),
        }
    }
}

fn prompt_region(table: &RegionTable, allow_all: bool) -> RegionFilter {
    let mut options: Vec<String> = table.labels().map(|l| l.to_string()).collect();
    if allow_all {
        options.insert(0, "All".to_string());
    }
    println!("Regions: {}", options.join(", "));
    loop {
        let answer = prompt_or("Select a Region", &options[0]);
        match answer.parse::<RegionFilter>() {
            Ok(RegionFilter::All) if !allow_all => println!("Pick a single region."),
            Ok(f) => return f,
            Err(e) => println!("{}", e),
        }
    }
}

fn prompt_selection(table: &RegionTable, ds: &Dataset, year_back: i32) -> Selection {
    let region = prompt_region(table, true);
    let years = aggregate::years(ds);
    println!(
        "Years: {}",
        years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ")
    );
    let year = prompt_number("Select a Year", aggregate::default_year(ds, year_back).unwrap_or(0));
    let months = aggregate::months(ds);
    let month = prompt_number("Select a Month", months.first().copied().unwrap_or(1));
    Selection {
        region,
        year,
        month,
    }
}

fn prompt_back_to_menu() -> bool {
    loop {
        let resp = prompt("Back to View Selection (Y/N)").to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(state: &mut AppState, args: &Args) {
    let sources = [
        (DatasetKind::Regional, &args.regional_file),
        (DatasetKind::Customers, &args.customers_file),
        (DatasetKind::Materials, &args.materials_file),
    ];
    for (kind, file) in sources {
        let path = args.data_dir.join(file);
        match loader::load_dataset(&path, kind, &state.table) {
            Ok((data, report)) => {
                let other = data
                    .iter()
                    .filter(|r| r.region == RegionLabel::Other)
                    .count();
                println!(
                    "{}: {} rows loaded, {} skipped, {} in region Other",
                    file,
                    util::format_int(report.kept_rows),
                    util::format_int(report.skipped_rows),
                    util::format_int(other)
                );
                match kind {
                    DatasetKind::Regional => state.regional = Some(data),
                    DatasetKind::Customers => state.customers = Some(data),
                    DatasetKind::Materials => state.materials = Some(data),
                }
            }
            Err(e) => {
                error!(path = %path.display(), "load failed: {}", e);
                eprintln!("Failed to load {}: {}", path.display(), e);
            }
        }
    }
    println!();
}

fn export<T: serde::Serialize>(dir: &Path, file: &str, rows: &[T]) {
    let path = dir.join(file);
    if let Err(e) = output::write_csv(&path, rows) {
        eprintln!("Write error: {}", e);
    }
}

fn handle_overview(state: &AppState, args: &Args) -> Result<()> {
    let Some(ds) = state.regional.as_ref() else {
        println!("Error: regional data not loaded. Please load the files first (option 1).\n");
        return Ok(());
    };
    let sel = prompt_selection(&state.table, ds, 1);
    let ov = dashboard::overview(ds, &sel)?;

    println!(
        "\nRegion: {}, Year: {}, Month: {}",
        sel.region, sel.year, sel.month
    );
    println!(
        "Total tonnes achieved in {} region(s): {}\n",
        sel.region,
        util::format_number(ov.total, 2)
    );
    if let RegionFilter::Only(label) = sel.region {
        println!("States: {}\n", state.table.states_of(label).join(", "));
    }
    output::preview_table("Metrics", &ov.cards(), 3);
    let rows = ov.region_rows();
    output::preview_table("Regional Breakdown", &rows, rows.len());

    export(&args.export_dir, "overview_regions.csv", &rows);
    if let Err(e) = output::write_json(&args.export_dir.join("overview.json"), &ov) {
        eprintln!("Write error: {}", e);
    }
    Ok(())
}

fn handle_customers(state: &AppState, args: &Args) -> Result<()> {
    let Some(ds) = state.customers.as_ref() else {
        println!("Error: customer data not loaded. Please load the files first (option 1).\n");
        return Ok(());
    };
    let sel = prompt_selection(&state.table, ds, 2);
    let names = aggregate::customers(ds)?;
    let customer = prompt_or(
        "Select Customer",
        names.first().map(String::as_str).unwrap_or(""),
    );
    let view = dashboard::customers(ds, &sel, &customer)?;

    let top_year = CustomerView::ranking_rows(&view.top_for_year);
    let top_month = CustomerView::ranking_rows(&view.top_for_month);
    output::preview_table(
        &format!(
            "Top {} Customers in {} region(s) for year {}",
            dashboard::TOP_CUSTOMERS_YEAR,
            sel.region,
            sel.year
        ),
        &top_year,
        top_year.len(),
    );
    output::preview_table(
        &format!(
            "Top {} Customers in {} region(s) for year {} month {}",
            dashboard::TOP_CUSTOMERS_MONTH,
            sel.region,
            sel.year,
            sel.month
        ),
        &top_month,
        top_month.len(),
    );
    println!("Selected Customer: {}\n", view.customer);
    output::preview_table("Metrics", &view.cards(&sel), 3);
    let history = view.history_rows();
    output::preview_table("Breakdown by year", &history, history.len());

    export(&args.export_dir, "customers_top_year.csv", &top_year);
    export(&args.export_dir, "customers_top_month.csv", &top_month);
    export(&args.export_dir, "customer_history.csv", &history);
    Ok(())
}

fn handle_trend(state: &AppState, args: &Args) -> Result<()> {
    let (Some(regional), Some(materials)) = (state.regional.as_ref(), state.materials.as_ref())
    else {
        println!("Error: regional and material data must be loaded first (option 1).\n");
        return Ok(());
    };
    let region = match prompt_region(&state.table, false) {
        RegionFilter::Only(label) => label,
        RegionFilter::All => return Ok(()),
    };
    let year = prompt_number(
        "Select a Year",
        aggregate::default_year(materials, 1).unwrap_or(0),
    );
    let month = prompt_number(
        "Select Month",
        aggregate::months(materials).first().copied().unwrap_or(1),
    );
    let previous_year = year.saturating_sub(1).to_string();
    let comparison_years: Vec<i32> = prompt_or("Comparison Years (comma separated)", &previous_year)
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let names = aggregate::materials(materials)?;
    let material = prompt_or(
        "Select Material Description",
        names.first().map(String::as_str).unwrap_or(""),
    );

    let req = TrendRequest {
        region,
        year,
        month,
        comparison_years,
        material,
    };
    let trend = dashboard::regional_trend(regional, materials, &req)?;
    info!(region = %region, year, "regional trend built");

    println!(
        "\nNational tonnes in {}: {}\n",
        year,
        util::format_number(trend.national_total, 2)
    );
    let monthly = trend.monthly_rows();
    output::preview_table(
        &format!("{} Regional Trend for {} and Comparison Years", region, year),
        &monthly,
        monthly.len(),
    );
    let daily = trend.daily_rows();
    output::preview_table(
        &format!(
            "{} sales in {} during month {}, {}",
            trend.material, region, month, year
        ),
        &daily,
        daily.len(),
    );

    export(&args.export_dir, "regional_trend.csv", &monthly);
    export(&args.export_dir, "material_daily.csv", &daily);
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let table = match &args.regions {
        Some(path) => match RegionTable::from_path(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Failed to read region table {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RegionTable::default_table().clone(),
    };
    let mut state = AppState {
        table,
        regional: None,
        customers: None,
        materials: None,
    };

    loop {
        println!("Select View:");
        println!("[1] Load the files");
        println!("[2] Regional overview");
        println!("[3] Customers");
        println!("[4] Regional trend\n");
        let result = match prompt("Enter choice").as_str() {
            "1" => {
                handle_load(&mut state, &args);
                continue;
            }
            "2" => handle_overview(&state, &args),
            "3" => handle_customers(&state, &args),
            "4" => handle_trend(&state, &args),
            _ => {
                println!("Invalid choice. Please enter 1, 2, 3 or 4.\n");
                continue;
            }
        };
        if let Err(e) = result {
            eprintln!("Error: {}\n", e);
        }
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}
