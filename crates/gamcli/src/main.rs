//! gam - Google Ad Manager reporting CLI

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;

use gamcli_core::admanager::AdManager;
use gamcli_core::config::{init_config, GamConfig};
use gamcli_core::dates::parse_user_date;
use gamcli_core::render::{cell, count_cell, format_table, to_json_pretty};
use gamcli_core::{errlog, normalize::Record};

#[derive(Parser)]
#[command(
    name = "gam",
    version,
    about = "Google Ad Manager command line tool",
    long_about = "Reporting client for Google Ad Manager.\n\
                  \n\
                  Examples:\n\
                    gam init gam.yaml\n\
                    gam user\n\
                    gam orders --limit 20\n\
                    gam orders --status delivering\n\
                    gam line-items --order-id 12345\n\
                    gam inventory --start 2026-02-24 --end 2026-03-10\n\
                    gam networks\n\
                    gam creatives --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file path (default: ~/.gam-cli/config.yaml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Show debug info (for troubleshooting)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize with a GAM config file
    Init {
        /// Path to the gam.yaml to copy into ~/.gam-cli
        config_path: PathBuf,
    },
    /// Show current user info
    User,
    /// List orders
    Orders {
        /// Max orders to show
        #[arg(long, short = 'l', default_value_t = 10)]
        limit: u32,
        /// Filter by status (e.g. APPROVED, DRAFT, delivering)
        #[arg(long)]
        status: Option<String>,
    },
    /// List line items
    LineItems {
        /// Filter by order ID
        #[arg(long)]
        order_id: Option<String>,
        /// Max items to show
        #[arg(long, short = 'l', default_value_t = 10)]
        limit: u32,
    },
    /// Show available inventory (forecast)
    Inventory {
        /// Inventory preset: run-of-site, desktop, mobile
        #[arg(long)]
        preset: Option<String>,
        /// Start date (DDMMYYYY or YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date (DDMMYYYY or YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// List available networks
    Networks,
    /// List creatives
    Creatives {
        /// Max creatives to show
        #[arg(long, short = 'l', default_value_t = 10)]
        limit: u32,
    },
}

impl Command {
    fn context(&self) -> &'static str {
        match self {
            Command::Init { .. } => "init",
            Command::User => "gam user",
            Command::Orders { .. } => "gam orders",
            Command::LineItems { .. } => "gam line-items",
            Command::Inventory { .. } => "gam inventory",
            Command::Networks => "gam networks",
            Command::Creatives { .. } => "gam creatives",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    // SIGINT maps to the conventional interrupt exit code.
    let _ = ctrlc::set_handler(|| std::process::exit(130));

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return;
    };

    let context = command.context();
    if let Err(err) = run(command, cli.config, cli.json).await {
        fail(context, &err);
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Single fatal-path handler: log, print, exit 1. No backtraces.
fn fail(context: &str, err: &anyhow::Error) -> ! {
    errlog::log_error(context, &format!("{:#}", err));
    eprintln!("Error: {:#}", err);
    if let Some(path) = errlog::log_path() {
        eprintln!("Details logged to: {}", path.display());
    }
    std::process::exit(1);
}

async fn run(command: Command, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    if let Command::Init { config_path } = &command {
        let network_code = init_config(config_path)?;
        println!("Configuration saved!");
        println!("Network Code: {}", network_code);
        return Ok(());
    }

    let config = GamConfig::load_default(config_path.as_deref())?;
    let gam = AdManager::from_config(&config)?;

    match command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::User => {
            let user = gam.current_user().await?;
            if json {
                println!("{}", to_json_pretty(&user));
            } else {
                println!("\n=== GAM Connection Info ===\n");
                println!("User: {}", cell(&user, "displayName"));
                println!("Email: {}", cell(&user, "email"));
                println!("User ID: {}", cell(&user, "id"));
                println!("Role: {}", cell(&user, "roleName"));
            }
        }
        Command::Orders { limit, status } => {
            let orders = gam.orders(limit, status.as_deref()).await?;
            if json {
                println!("{}", to_json_pretty(&orders));
            } else {
                println!("\n=== Orders (showing {}) ===\n", orders.len());
                if orders.is_empty() {
                    println!("No orders found.");
                } else {
                    print_orders(&orders);
                }
            }
        }
        Command::LineItems { order_id, limit } => {
            let items = gam.line_items(order_id.as_deref(), limit).await?;
            if json {
                println!("{}", to_json_pretty(&items));
            } else {
                println!("\n=== Line Items (showing {}) ===\n", items.len());
                if items.is_empty() {
                    println!("No line items found.");
                } else {
                    print_line_items(&items);
                }
            }
        }
        Command::Inventory { preset, start, end } => {
            // Unparseable dates fall back to the defaults rather than failing.
            let today = Local::now().date_naive();
            let start_date = start.as_deref().and_then(parse_user_date);
            let end_date = end.as_deref().and_then(parse_user_date);
            let start_date = start_date.unwrap_or_else(|| today + Duration::days(1));
            let end_date = end_date.unwrap_or_else(|| default_end(start_date));

            let listing = gam
                .inventory(preset.as_deref(), Some(start_date), Some(end_date))
                .await;
            if json {
                let payload = json!({
                    "rows": listing.rows,
                    "startStr": listing.start,
                    "endStr": listing.end,
                    "mode": "forecast",
                    "error": null,
                });
                println!("{}", to_json_pretty(&payload));
            } else {
                println!(
                    "\n=== Inventory Forecast ({} to {}) ===\n",
                    listing.start, listing.end
                );
                if listing.rows.is_empty() {
                    println!("No inventory data.");
                } else {
                    print_inventory(&listing.rows);
                }
            }
        }
        Command::Networks => {
            let networks = gam.networks().await?;
            if json {
                println!("{}", to_json_pretty(&networks));
            } else {
                println!("\n=== Available Networks ===\n");
                for n in &networks {
                    println!("Network Code: {}", cell(n, "networkCode"));
                    println!("Display Name: {}", cell(n, "displayName"));
                    println!("Property Code: {}", cell(n, "propertyCode"));
                    println!();
                }
            }
        }
        Command::Creatives { limit } => {
            let creatives = gam.creatives(limit).await?;
            if json {
                println!("{}", to_json_pretty(&creatives));
            } else {
                println!("\n=== Creatives (showing {}) ===\n", creatives.len());
                if creatives.is_empty() {
                    println!("No creatives found.");
                } else {
                    print_creatives(&creatives);
                }
            }
        }
    }

    Ok(())
}

fn default_end(start: NaiveDate) -> NaiveDate {
    start + Duration::days(7)
}

fn print_orders(orders: &[Record]) {
    let rows: Vec<Vec<String>> = orders
        .iter()
        .map(|o| {
            vec![
                cell(o, "id"),
                cell(o, "name"),
                cell(o, "status"),
                cell(o, "startDate"),
                cell(o, "endDate"),
                count_cell(o, "impressions"),
                count_cell(o, "clicks"),
                cell(o, "currency"),
                cell(o, "advertiserId"),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(
            &[
                "ID",
                "Name",
                "Status",
                "Start",
                "End",
                "Impressions",
                "Clicks",
                "Currency",
                "Advertiser",
            ],
            &rows,
        )
    );
}

fn print_line_items(items: &[Record]) {
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|li| {
            vec![
                cell(li, "id"),
                cell(li, "name"),
                cell(li, "orderId"),
                cell(li, "status"),
                cell(li, "lineItemType"),
                cell(li, "startDate"),
                cell(li, "endDate"),
                count_cell(li, "impressions"),
                count_cell(li, "clicks"),
                cell(li, "ctr"),
                cell(li, "progress"),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(
            &[
                "ID",
                "Name",
                "Order ID",
                "Status",
                "Type",
                "Start",
                "End",
                "Impressions",
                "Clicks",
                "CTR",
                "Progress",
            ],
            &rows,
        )
    );
}

fn print_inventory(rows: &[Record]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                cell(r, "preset"),
                cell(r, "sizes"),
                cell(r, "available"),
                cell(r, "forecasted"),
                cell(r, "reserved"),
                cell(r, "str"),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(
            &["Preset", "Sizes", "Available", "Forecasted", "Reserved", "STR%"],
            &table_rows,
        )
    );
}

fn print_creatives(creatives: &[Record]) {
    let rows: Vec<Vec<String>> = creatives
        .iter()
        .map(|c| vec![cell(c, "id"), cell(c, "name"), cell(c, "advertiserId")])
        .collect();
    print!(
        "{}",
        format_table(&["ID", "Name", "Advertiser ID"], &rows)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["gam", "orders", "--limit", "20", "--status", "delivering"]);
        match cli.command {
            Some(Command::Orders { limit, status }) => {
                assert_eq!(limit, 20);
                assert_eq!(status.as_deref(), Some("delivering"));
            }
            _ => panic!("expected orders subcommand"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["gam", "line-items", "--order-id", "12345", "--json"]);
        assert!(cli.json);
        match cli.command {
            Some(Command::LineItems { order_id, limit }) => {
                assert_eq!(order_id.as_deref(), Some("12345"));
                assert_eq!(limit, 10);
            }
            _ => panic!("expected line-items subcommand"),
        }
    }

    #[test]
    fn test_default_end_is_one_week_out() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 24).unwrap();
        assert_eq!(default_end(start), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
    }
}
