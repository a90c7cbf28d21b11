use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use hbase_import::{
    ImportError,
    cli::{self, JobOverrides},
    client::AvailabilityPolicy,
    mapping::RowKeyColumn,
};
use owo_colors::OwoColorize;
use std::sync::Arc;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// HBase Import: load rows from NDJSON record files into HBase tables
#[derive(Parser)]
#[command(name = "hbimport", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source connection settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Treat the HBase client as unavailable without contacting it
    #[arg(long, global = true)]
    force_unavailable: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an NDJSON record file into the job's table
    Import {
        /// Job file describing the target table and column mapping
        job: String,

        /// NDJSON file with one record per line
        records: String,

        /// Target table, overriding the job file
        #[arg(short, long)]
        table: Option<String>,

        /// Default column family, overriding the job file
        #[arg(short = 'f', long)]
        column_family: Option<String>,

        /// Create the table if it does not exist
        #[arg(long)]
        create_table: bool,

        /// Also write the row-key column as a cell
        #[arg(long)]
        add_row_key: bool,

        /// Row-key column, by name or zero-based index
        #[arg(short, long)]
        row_key: Option<RowKeyColumn>,

        /// Mutations per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Parallel import workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Check that HBase is reachable and the job's table exists
    Check {
        /// Job file describing the target table
        job: String,
    },

    /// Create the job's table if it does not exist
    CreateTable {
        /// Job file describing the target table and column families
        job: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let availability = match cli.force_unavailable {
        true => AvailabilityPolicy::ForceUnavailable,
        false => AvailabilityPolicy::Probe,
    };

    match cli.command {
        Commands::Import {
            job,
            records,
            table,
            column_family,
            create_table,
            add_row_key,
            row_key,
            batch_size,
            workers,
        } => {
            let overrides = JobOverrides {
                table,
                column_family,
                create_table,
                add_row_key,
                row_key,
                batch_size,
                workers,
            };
            let config = cli::load_job(&job, &overrides)?;
            let store = Arc::new(cli::load_rest_store()?);

            log::info!(
                "Importing {} into {} ({} worker(s), batches of {})",
                records.bright_black(),
                config.table.cyan(),
                config.workers,
                config.batch_size
            );

            let result = cli::import_file(config, store, &records, availability, |handle| {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("Interrupted, stopping import");
                        handle.cancel();
                    }
                });
            })
            .await;

            match result {
                Ok(report) => {
                    log::info!(
                        "{} {} row(s) written, {} skipped, {} read",
                        "✓".green(),
                        report.rows_written,
                        report.rows_skipped,
                        report.rows_read
                    );
                }
                Err(e) => {
                    if let Some(import_error) = e.downcast_ref::<ImportError>() {
                        log::error!("Job {} ({})", "FAILED".red(), import_error.kind().red());
                    }
                    return Err(e);
                }
            }
        }
        Commands::Check { job } => {
            let config = cli::load_job(&job, &JobOverrides::default())?;
            let table = config.table.clone();
            let store = Arc::new(cli::load_rest_store()?);

            log::info!("Checking HBase at {}", store.url().as_str().bright_black());
            let status = cli::check_prerequisites(config, store, availability).await?;

            if !status.client_available {
                eyre::bail!("HBase client is unavailable");
            }
            log::info!("{} HBase client is available", "✓".green());

            if !status.table_exists {
                eyre::bail!("Table '{}' does not exist", table);
            }
            log::info!("{} Table {} exists", "✓".green(), table.cyan());
        }
        Commands::CreateTable { job } => {
            let config = cli::load_job(&job, &JobOverrides::default())?;
            let store = cli::load_rest_store()?;

            if !cli::create_table(&config, &store, availability).await? {
                log::info!("Nothing to do for {}", config.table.cyan());
            }
        }
    }

    Ok(())
}
