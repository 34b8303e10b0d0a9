use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mdw_pipeline::{run_refresh_genres, run_refresh_movies, run_select, RunSummary, WarehouseConfig};
use mdw_store::{FsArchiveStore, MySqlStore, SheetWriter, SheetsClient, TmdbClient};

#[derive(Debug, Parser)]
#[command(name = "mdw-cli")]
#[command(about = "Movie details warehouse command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh the movie_details table from the latest archived links file.
    RefreshMovies {
        /// Leave scratch artifacts out of the archive.
        #[arg(long)]
        skip_upload: bool,
    },
    /// Refresh the genres table from the catalog genre list.
    RefreshGenres {
        #[arg(long)]
        skip_upload: bool,
    },
    /// Run a read query from a .sql file and snapshot the result.
    Select {
        sql_file: PathBuf,
        #[arg(long)]
        skip_upload: bool,
    },
}

fn maybe_sheet(config: &WarehouseConfig) -> Result<Option<SheetsClient>> {
    match (&config.spreadsheet_id, &config.sheets_token) {
        (Some(id), Some(token)) => Ok(Some(SheetsClient::new(
            id,
            &config.sheet_name,
            token,
            config.timeout(),
        )?)),
        _ => Ok(None),
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "run complete: run_id={} links={} records={} replace={} exported={} uploaded={} swept_remote={} swept_local={}",
        summary.run_id,
        summary.links,
        summary.records,
        summary.replace_status,
        summary.exported_rows,
        summary.uploaded,
        summary.swept_remote,
        summary.swept_local,
    );
    if let Some(status) = &summary.sheet_status {
        println!("sheet: {status}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = WarehouseConfig::from_env();

    let archive = FsArchiveStore::new(config.archive_dir.clone());
    let mut store = MySqlStore::connect(&config.database_url, config.timeout()).await?;

    let summary = match cli.command {
        Commands::RefreshMovies { skip_upload } => {
            let catalog = TmdbClient::new(
                &config.catalog_base_url,
                &config.catalog_api_key,
                config.timeout(),
            )?;
            let sheet = maybe_sheet(&config)?;
            run_refresh_movies(
                &config,
                &archive,
                &catalog,
                &mut store,
                sheet.as_ref().map(|s| s as &dyn SheetWriter),
                !skip_upload,
            )
            .await?
        }
        Commands::RefreshGenres { skip_upload } => {
            let catalog = TmdbClient::new(
                &config.catalog_base_url,
                &config.catalog_api_key,
                config.timeout(),
            )?;
            run_refresh_genres(&config, &archive, &catalog, &mut store, !skip_upload).await?
        }
        Commands::Select { sql_file, skip_upload } => {
            let sheet = maybe_sheet(&config)?;
            run_select(
                &config,
                &archive,
                &mut store,
                sheet.as_ref().map(|s| s as &dyn SheetWriter),
                &sql_file,
                !skip_upload,
            )
            .await?
        }
    };

    print_summary(&summary);
    Ok(())
}
