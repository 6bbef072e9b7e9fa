//! google-tools - Unified GA4 / Ad Manager CLI
//!
//! The `ga4` subcommand queries the analytics data API, `ga4-auth` walks
//! through the OAuth setup, and `gam` exposes the Ad Manager listers
//! against an explicit config file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{Duration, Local};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde_json::json;

use gamcli_core::admanager::AdManager;
use gamcli_core::config::GamConfig;
use gamcli_core::dates::parse_user_date;
use gamcli_core::errlog;
use gamcli_core::error::CoreError;
use gamcli_core::ga4::{self, oauth, Ga4Client, Ga4Query};
use gamcli_core::normalize::Record;
use gamcli_core::render::{cell, format_table, to_json_pretty};

#[derive(Parser)]
#[command(
    name = "google-tools",
    version,
    about = "Unified CLI for Google Analytics 4 and Google Ad Manager",
    long_about = "Examples:\n\
                  # GA4 Analytics Query\n\
                  google-tools ga4 --property 268092156 --metrics screenPageViews,sessions --dimensions pagePath\n\
                  google-tools ga4 -p 268092156 --filter \"pagePath=~/news/\" --json\n\
                  \n\
                  # GA4 OAuth Setup\n\
                  google-tools ga4-auth url --client-id YOUR_CLIENT_ID\n\
                  google-tools ga4-auth exchange --client-id ID --client-secret SECRET --code AUTH_CODE\n\
                  \n\
                  # Google Ad Manager\n\
                  google-tools gam --config gam.yaml user\n\
                  google-tools gam --config gam.yaml orders --limit 20\n\
                  google-tools gam --config gam.yaml line-items --order-id 12345"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Query GA4 Analytics data
    Ga4(Ga4Args),
    /// GA4 OAuth setup helper
    Ga4Auth {
        #[command(subcommand)]
        command: Option<AuthCommand>,
    },
    /// Google Ad Manager operations
    Gam(GamArgs),
}

#[derive(Args)]
struct Ga4Args {
    /// GA4 Property ID (or set GA4_PROPERTY_ID env var)
    #[arg(long, short = 'p', env = "GA4_PROPERTY_ID")]
    property: Option<String>,

    /// Path to service account JSON file
    #[arg(long)]
    service_account: Option<PathBuf>,

    /// Comma-separated metrics
    #[arg(long, short = 'm', default_value = "screenPageViews")]
    metrics: String,

    /// Comma-separated dimensions
    #[arg(long, short = 'd', default_value = "pagePath")]
    dimensions: String,

    /// Start date (YYYY-MM-DD or relative like 30daysAgo)
    #[arg(long, short = 's', default_value = "30daysAgo")]
    start: String,

    /// End date (YYYY-MM-DD or relative like yesterday)
    #[arg(long, short = 'e', default_value = "yesterday")]
    end: String,

    /// Max rows
    #[arg(long, short = 'l', default_value_t = 25)]
    limit: u32,

    /// Filter (e.g. 'pagePath=~/blog/', 'pagePath==exact', 'pagePath!=exclude')
    #[arg(long, short = 'f')]
    filter: Option<String>,

    /// Order by metric (e.g. 'screenPageViews:desc')
    #[arg(long, short = 'o')]
    order_by: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Output as CSV
    #[arg(long)]
    csv: bool,
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Generate OAuth authorization URL
    Url {
        /// OAuth Client ID
        #[arg(long)]
        client_id: String,
        /// Redirect URI
        #[arg(long, default_value = oauth::DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },
    /// Exchange authorization code for tokens
    Exchange {
        /// OAuth Client ID
        #[arg(long)]
        client_id: String,
        /// OAuth Client Secret
        #[arg(long)]
        client_secret: String,
        /// Authorization code from redirect
        #[arg(long)]
        code: String,
        /// Redirect URI
        #[arg(long, default_value = oauth::DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },
}

#[derive(Args)]
struct GamArgs {
    /// Path to GAM YAML config file
    #[arg(long, short = 'c', default_value = "gam.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<GamCommand>,
}

#[derive(Subcommand)]
enum GamCommand {
    /// Show current user info
    User,
    /// List orders
    Orders {
        /// Max orders to show
        #[arg(long, short = 'l', default_value_t = 10)]
        limit: u32,
        /// Filter by status (e.g. APPROVED, DRAFT)
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
    /// List available networks
    Networks,
    /// List creatives
    Creatives {
        /// Max creatives to show
        #[arg(long, short = 'l', default_value_t = 10)]
        limit: u32,
    },
    /// Future inventory forecast (traffic data, Ad Manager 360 only)
    Inventory {
        /// Start date (YYYY-MM-DD or DDMMYYYY)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD or DDMMYYYY)
        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing();

    let _ = ctrlc::set_handler(|| std::process::exit(130));

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    };

    let context = match &command {
        Command::Ga4(_) => "ga4",
        Command::Ga4Auth { .. } => "ga4-auth",
        Command::Gam(_) => "gam",
    };
    if let Err(err) = run(command).await {
        fail(context, &err);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn fail(context: &str, err: &anyhow::Error) -> ! {
    errlog::log_error(context, &format!("{:#}", err));
    eprintln!("Error: {:#}", err);
    if let Some(path) = errlog::log_path() {
        eprintln!("Details logged to: {}", path.display());
    }
    std::process::exit(1);
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Ga4(args) => run_ga4(args).await,
        Command::Ga4Auth { command } => run_ga4_auth(command).await,
        Command::Gam(args) => run_gam(args).await,
    }
}

// ============================================================================
// GA4 report
// ============================================================================

async fn run_ga4(args: Ga4Args) -> Result<()> {
    let Some(property) = args.property else {
        bail!("GA4 Property ID required. Use --property/-p or set GA4_PROPERTY_ID env var.");
    };

    let credentials_file = args
        .service_account
        .or_else(|| std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok().map(PathBuf::from));

    let query = Ga4Query {
        property: property.clone(),
        metrics: ga4::split_list(&args.metrics),
        dimensions: ga4::split_list(&args.dimensions),
        start: args.start.clone(),
        end: args.end.clone(),
        limit: args.limit,
        filter: args.filter,
        order_by: args.order_by,
    };

    let client = Ga4Client::new(credentials_file)?;
    let report = client.run_report(&query).await?;

    if args.json {
        let rows: Vec<serde_json::Value> = report
            .rows
            .iter()
            .map(|row| {
                let mut item = serde_json::Map::new();
                for (name, value) in query.dimensions.iter().zip(&row.dimensions) {
                    item.insert(name.clone(), json!(value));
                }
                for (name, value) in query.metrics.iter().zip(&row.metrics) {
                    item.insert(name.clone(), json!(value));
                }
                serde_json::Value::Object(item)
            })
            .collect();

        let output = json!({
            "property": property,
            "date_range": {"start": query.start, "end": query.end},
            "dimensions": query.dimensions,
            "metrics": query.metrics,
            "row_count": report.row_count,
            "rows": rows,
        });
        println!("{}", to_json_pretty(&output));
    } else if args.csv {
        let headers: Vec<&str> = query
            .dimensions
            .iter()
            .chain(&query.metrics)
            .map(String::as_str)
            .collect();
        println!("{}", headers.join(","));
        for row in &report.rows {
            let values: Vec<String> = row
                .dimensions
                .iter()
                .chain(&row.metrics)
                .map(|v| csv_escape(v))
                .collect();
            println!("{}", values.join(","));
        }
    } else {
        let headers: Vec<&str> = query
            .dimensions
            .iter()
            .chain(&query.metrics)
            .map(String::as_str)
            .collect();
        let rows: Vec<Vec<String>> = report
            .rows
            .iter()
            .map(|row| {
                row.dimensions
                    .iter()
                    .chain(&row.metrics)
                    .cloned()
                    .collect()
            })
            .collect();

        println!("\nGA4 Report: {} to {}", query.start, query.end);
        println!("Property: {}\n", property);
        print!("{}", format_table(&headers, &rows));
        println!("\nTotal rows: {}", report.row_count);
    }

    Ok(())
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

// ============================================================================
// GA4 OAuth setup
// ============================================================================

async fn run_ga4_auth(command: Option<AuthCommand>) -> Result<()> {
    let Some(command) = command else {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    };

    match command {
        AuthCommand::Url {
            client_id,
            redirect_uri,
        } => {
            let url = oauth::authorization_url(&client_id, &redirect_uri);
            println!("\n=== GA4 OAuth Authorization ===\n");
            println!("1. Open this URL in your browser:");
            println!("\n   {}\n", url);
            println!("2. Sign in and authorize access to Analytics");
            println!("3. Copy the 'code' parameter from the redirect URL");
            println!("4. Run:");
            println!(
                "   google-tools ga4-auth exchange --client-id {} --client-secret YOUR_SECRET --code AUTH_CODE",
                client_id
            );
        }
        AuthCommand::Exchange {
            client_id,
            client_secret,
            code,
            redirect_uri,
        } => {
            println!("Exchanging authorization code for tokens...");
            let http = reqwest::Client::new();
            let tokens =
                oauth::exchange_code(&http, &client_id, &client_secret, &code, &redirect_uri)
                    .await?;

            println!("\n=== OAuth Tokens ===\n");
            if tokens.access_token.len() > 50 {
                println!("Access Token: {}...", &tokens.access_token[..50]);
            } else {
                println!("Access Token: {}", tokens.access_token);
            }
            println!(
                "Refresh Token: {}",
                tokens.refresh_token.as_deref().unwrap_or("N/A")
            );
            println!("Expires In: {} seconds", tokens.expires_in);
            println!("\n=== Environment Variables ===\n");
            println!("Add these to your shell or .env file:\n");
            println!("export GOOGLE_CLIENT_ID='{}'", client_id);
            println!("export GOOGLE_CLIENT_SECRET='{}'", client_secret);
            println!(
                "export GOOGLE_REFRESH_TOKEN='{}'",
                tokens.refresh_token.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

// ============================================================================
// Ad Manager
// ============================================================================

async fn run_gam(args: GamArgs) -> Result<()> {
    let Some(command) = args.command else {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    };

    if !args.config.exists() {
        bail!(
            "GAM config file not found: {}\n\nCreate a gam.yaml file with format:\n\n\
             ad_manager:\n  \
               application_name: \"Your App Name\"\n  \
               network_code: \"YOUR_NETWORK_CODE\"\n  \
               path_to_private_key_file: \"/path/to/service-account.json\"",
            args.config.display()
        );
    }

    let config = GamConfig::load(&args.config)?;
    let gam = AdManager::from_config(&config)?;
    let json = args.json;

    match command {
        GamCommand::User => {
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
        GamCommand::Orders { limit, status } => {
            let orders = gam.orders(limit, status.as_deref()).await?;
            println!("\n=== Orders (showing {}) ===\n", orders.len());
            if json {
                println!("{}", to_json_pretty(&orders));
            } else {
                print_simple(
                    &["ID", "Name", "Status"],
                    &orders,
                    &["id", "name", "status"],
                );
            }
        }
        GamCommand::LineItems { order_id, limit } => {
            let items = gam.line_items(order_id.as_deref(), limit).await?;
            println!("\n=== Line Items (showing {}) ===\n", items.len());
            if json {
                println!("{}", to_json_pretty(&items));
            } else {
                print_simple(
                    &["ID", "Name", "Order ID", "Status"],
                    &items,
                    &["id", "name", "orderId", "status"],
                );
            }
        }
        GamCommand::Networks => {
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
        GamCommand::Creatives { limit } => {
            let creatives = gam.creatives(limit).await?;
            println!("\n=== Creatives (showing {}) ===\n", creatives.len());
            if json {
                println!("{}", to_json_pretty(&creatives));
            } else {
                print_simple(
                    &["ID", "Name", "Advertiser ID"],
                    &creatives,
                    &["id", "name", "advertiserId"],
                );
            }
        }
        GamCommand::Inventory { start, end } => {
            let today = Local::now().date_naive();
            let start_date = start
                .as_deref()
                .and_then(parse_user_date)
                .unwrap_or_else(|| today - Duration::days(7));
            let end_date = end
                .as_deref()
                .and_then(parse_user_date)
                .unwrap_or_else(|| today + Duration::days(30));

            match gam.traffic_forecast(start_date, end_date).await {
                Ok(Some(total)) => {
                    if json {
                        let output = json!({
                            "forecasted": total,
                            "start": start_date.format("%Y-%m-%d").to_string(),
                            "end": end_date.format("%Y-%m-%d").to_string(),
                        });
                        println!("{}", to_json_pretty(&output));
                    } else {
                        println!("\n=== Inventory Forecast (getTrafficData) ===\n");
                        println!("Date range: {} to {}", start_date, end_date);
                        println!(
                            "Forecasted impressions: {}",
                            gamcli_core::render::fmt_thousands(total)
                        );
                    }
                }
                Ok(None) => {
                    println!("\n=== Inventory Forecast ===\n");
                    println!("No forecasted data returned.");
                }
                Err(e) => {
                    if is_unsupported_operation(&e) {
                        bail!(
                            "getTrafficData requires Ad Manager 360. This network may not have access."
                        );
                    }
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

/// The 360-only endpoint rejects standard networks with a common-error
/// fault; surface that as guidance instead of a raw fault string.
fn is_unsupported_operation(err: &CoreError) -> bool {
    let text = err.to_string();
    text.contains("UNSUPPORTED_OPERATION") || text.contains("CommonError")
}

fn print_simple(headers: &[&str], records: &[Record], keys: &[&str]) {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|rec| keys.iter().map(|k| cell(rec, k)).collect())
        .collect();
    print!("{}", format_table(headers, &rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ga4_defaults() {
        let cli = Cli::parse_from(["google-tools", "ga4", "-p", "268092156"]);
        match cli.command {
            Some(Command::Ga4(args)) => {
                assert_eq!(args.metrics, "screenPageViews");
                assert_eq!(args.dimensions, "pagePath");
                assert_eq!(args.start, "30daysAgo");
                assert_eq!(args.end, "yesterday");
                assert_eq!(args.limit, 25);
                assert!(!args.json);
            }
            _ => panic!("expected ga4 subcommand"),
        }
    }

    #[test]
    fn test_ga4_auth_exchange_parses() {
        let cli = Cli::parse_from([
            "google-tools",
            "ga4-auth",
            "exchange",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--code",
            "4/0abc",
        ]);
        match cli.command {
            Some(Command::Ga4Auth {
                command: Some(AuthCommand::Exchange { code, redirect_uri, .. }),
            }) => {
                assert_eq!(code, "4/0abc");
                assert_eq!(redirect_uri, oauth::DEFAULT_REDIRECT_URI);
            }
            _ => panic!("expected ga4-auth exchange subcommand"),
        }
    }

    #[test]
    fn test_gam_nested_subcommand() {
        let cli = Cli::parse_from([
            "google-tools",
            "gam",
            "--config",
            "other.yaml",
            "--json",
            "orders",
            "-l",
            "20",
        ]);
        match cli.command {
            Some(Command::Gam(args)) => {
                assert_eq!(args.config, PathBuf::from("other.yaml"));
                assert!(args.json);
                assert!(matches!(
                    args.command,
                    Some(GamCommand::Orders { limit: 20, .. })
                ));
            }
            _ => panic!("expected gam subcommand"),
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
    }
}
