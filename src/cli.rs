//! CLI definition and dispatch.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::company::NewCompany;
use crate::domain::error::QuantledgerError;
use crate::domain::etl_run::{EtlRun, RunStatus};
use crate::domain::validation::clean_price_rows;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "quantledger", about = "Versioned financial time-series store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the schema (idempotent)
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register a company
    AddCompany {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        isin: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List companies, optionally for one exchange
    ListCompanies {
        #[arg(long)]
        exchange: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Import a daily price CSV for one company, skipping dates already stored
    ImportPrices {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(short, long)]
        file: PathBuf,
        /// Skip the cleaning pass and insert rows as-is
        #[arg(long)]
        raw: bool,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored data extent for a company
    Info {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show recent pipeline runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Init { config } => with_store(&config, |store| store.initialize_schema()),
        Command::AddCompany {
            symbol,
            exchange,
            name,
            isin,
            config,
        } => with_store(&config, |store| {
            let mut company = NewCompany::new(&symbol, &exchange);
            company.name = name.clone();
            company.isin = isin.clone();
            let id = store.insert_company(&company)?;
            println!("added {symbol} on {exchange} (id {id})");
            Ok(())
        }),
        Command::ListCompanies { exchange, config } => with_store(&config, |store| {
            let companies = store.list_companies(exchange.as_deref())?;
            for c in &companies {
                println!(
                    "{:>6}  {:<12} {:<6} {}",
                    c.id,
                    c.symbol,
                    c.exchange,
                    c.name.as_deref().unwrap_or("-")
                );
            }
            println!("{} companies", companies.len());
            Ok(())
        }),
        Command::ImportPrices {
            symbol,
            exchange,
            file,
            raw,
            config,
        } => with_store(&config, |store| {
            import_prices(store, &symbol, &exchange, &file, raw)
        }),
        Command::Info {
            symbol,
            exchange,
            config,
        } => with_store(&config, |store| {
            let company = store.find_company(&symbol, &exchange)?.ok_or_else(|| {
                QuantledgerError::UnknownCompany {
                    symbol: symbol.clone(),
                    exchange: exchange.clone(),
                }
            })?;
            match store.price_range(company.id)? {
                Some((min, max, count)) => {
                    println!("{symbol} on {exchange}: {count} bars from {min} to {max}")
                }
                None => println!("{symbol} on {exchange}: no price data"),
            }
            let facts = store.company_fact_counts(company.id)?;
            println!(
                "facts: {} prices, {} actions, {} features, {} predictions, {} statements",
                facts.prices,
                facts.corporate_actions,
                facts.features,
                facts.predictions,
                facts.balance_sheets + facts.income_statements + facts.cashflow_statements,
            );
            Ok(())
        }),
        Command::Runs { limit, config } => with_store(&config, |store| {
            for run in store.list_runs(limit)? {
                println!(
                    "{:<32} {:<8} rows={} {}",
                    run.pipeline_name,
                    run.status,
                    run.rows_processed.unwrap_or(0),
                    run.error_message.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

fn with_store<F>(config_path: &Path, f: F) -> Result<(), QuantledgerError>
where
    F: FnOnce(&dyn StorePort) -> Result<(), QuantledgerError>,
{
    let config = FileConfigAdapter::from_file(config_path)?;
    let store = open_store(&config)?;
    f(store.as_ref())
}

#[cfg(feature = "sqlite")]
fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn StorePort>, QuantledgerError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    Ok(Box::new(SqliteAdapter::from_config(config)?))
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn StorePort>, QuantledgerError> {
    use crate::adapters::postgres_adapter::PostgresAdapter;
    Ok(Box::new(PostgresAdapter::from_config(config)?))
}

/// Idempotent import: read, optionally clean, insert only missing dates,
/// and append an audit record whatever the outcome.
pub fn import_prices(
    store: &dyn StorePort,
    symbol: &str,
    exchange: &str,
    file: &Path,
    raw: bool,
) -> Result<(), QuantledgerError> {
    let started_at = Utc::now().naive_utc();
    let pipeline = format!("import_prices:{symbol}.{exchange}");

    let company_id = store.ensure_company(&NewCompany::new(symbol, exchange))?;

    let mut rows = match csv_adapter::read_price_file(file, company_id) {
        Ok(rows) => rows,
        Err(err) => {
            store.log_run(
                &EtlRun::new(&pipeline, RunStatus::Failed)
                    .with_error(&err.to_string())
                    .with_window(started_at, Utc::now().naive_utc()),
            )?;
            return Err(err);
        }
    };
    rows.sort_by_key(|r| r.trade_date);
    let read = rows.len();

    let dropped = if raw {
        0
    } else {
        let (cleaned, dropped) = clean_price_rows(&rows);
        rows = cleaned;
        dropped
    };

    let inserted = store.insert_missing_prices(&rows)?;
    tracing::info!(symbol, exchange, read, dropped, inserted, "import finished");

    let status = if dropped > 0 {
        RunStatus::Partial
    } else {
        RunStatus::Success
    };
    let mut run = EtlRun::new(&pipeline, status)
        .with_rows(inserted as i32)
        .with_window(started_at, Utc::now().naive_utc());
    if dropped > 0 {
        run = run.with_error(&format!("{dropped} rows dropped by validation"));
    }
    store.log_run(&run)?;

    println!("{symbol} on {exchange}: read {read}, dropped {dropped}, inserted {inserted}");
    Ok(())
}
