use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use photo_trails_sync::catalog::{render_table, CatalogClient, CatalogPreview, CatalogSource};
use photo_trails_sync::config::{self, ClientConfig};
use photo_trails_sync::events::{EventBus, MapRefreshHandler, SyncEvent, SyncEventPayload};
use photo_trails_sync::logging::{init_logging, DebugLog};
use photo_trails_sync::map::{GeoPageLoader, LoadOutcome, MarkerLayer};
use photo_trails_sync::shutdown::ShutdownCoordinator;
use photo_trails_sync::upload::{collect_files, http_executor, BatchLimits, UploadOrchestrator, NO_FILE_SELECTED};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// phototrails - batch photo uploader and catalog viewer
#[derive(Parser)]
#[command(name = "phototrails")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.phototrails/config.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server base URL, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload photos and videos (files or directories) in batches
    Upload {
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Print the catalog preview table
    Photos,
    /// Load every geotagged photo and print the map markers
    Map,
    /// Remove every record from the catalog
    Clear,
    /// Print the effective configuration
    Config {
        /// Write it to the config file as well
        #[arg(long)]
        save: bool,
    },
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = config::load_config_from(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => config::load_config()?,
    };
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match config::get_logs_dir() {
        Ok(logs_dir) => {
            if let Err(e) = init_logging(&logs_dir) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to initialize logging: {}", e),
    }

    let config = resolve_config(&cli).context("Failed to load configuration")?;
    let debug_log = DebugLog::new();
    let catalog: Arc<dyn CatalogSource> = Arc::new(CatalogClient::from_config(&config)?);

    match cli.command {
        Commands::Upload { paths } => run_upload(&config, catalog, debug_log, &paths).await,
        Commands::Photos => {
            let preview = CatalogPreview::new(catalog, debug_log);
            if !preview.refresh().await {
                bail!("Could not fetch the catalog from {}", config.server_url);
            }
            print!("{}", render_table(&preview.rows()));
            Ok(())
        }
        Commands::Map => run_map(&config, catalog, debug_log).await,
        Commands::Clear => {
            let preview = CatalogPreview::new(catalog, debug_log);
            let message = preview.clear_and_refresh().await;
            println!("{}", message);
            Ok(())
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = match cli.config {
                    Some(path) => path,
                    None => config::get_config_file_path()?,
                };
                config::save_config_to(&path, &config)?;
                println!("Saved to {}", path.display());
            }
            Ok(())
        }
    }
}

/// One console line per batch event, numbered from 1 like the status text.
fn describe_event(event: &SyncEvent) -> Option<String> {
    match &event.payload {
        SyncEventPayload::BatchIngested {
            batch_index,
            batches_total,
            accepted,
            ..
        } => Some(format!(
            "Batch {}/{}: {} file(s) ingested",
            batch_index + 1,
            batches_total,
            accepted
        )),
        SyncEventPayload::BatchFailed { batch_index, .. } => {
            Some(format!("Batch {} failed, continuing", batch_index + 1))
        }
        SyncEventPayload::SessionCompleted { .. } => None,
    }
}

async fn run_upload(
    config: &ClientConfig,
    catalog: Arc<dyn CatalogSource>,
    debug_log: DebugLog,
    paths: &[PathBuf],
) -> Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        println!("{}", NO_FILE_SELECTED);
        return Ok(());
    }

    let events = EventBus::default();
    let shutdown = ShutdownCoordinator::new();

    let layer = Arc::new(MarkerLayer::new());
    let loader = Arc::new(GeoPageLoader::new(
        Arc::clone(&catalog),
        layer.clone(),
        config.geo_page_size,
        debug_log.clone(),
    ));
    // Initial display, then reload on every data change
    loader.load_all().await;
    let map_handler = MapRefreshHandler::new(Arc::clone(&loader), events.clone(), shutdown.clone()).start();

    let preview = CatalogPreview::new(catalog, debug_log.clone());
    let orchestrator = UploadOrchestrator::new(
        Arc::new(http_executor(config)?),
        BatchLimits::from_config(config),
        events.clone(),
        debug_log,
    )
    .with_catalog_preview(preview.clone())
    .with_progress_reset_delay(config.progress_reset_delay());

    // Console progress, one line per batch
    let mut rx = orchestrator.subscribe();
    let mut shutdown_rx = shutdown.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(event) => match describe_event(&event) {
                        Some(line) => println!("{}", line),
                        None => break,
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    let outcome = orchestrator.upload(files).await?;

    for line in orchestrator.state()?.combined_log {
        println!("{}", line);
    }
    println!("{}", outcome.status_message);

    if preview.refresh().await {
        print!("{}", render_table(&preview.rows()));
    }

    let _ = reporter.await;
    shutdown.shutdown();
    if let Err(e) = map_handler.await {
        warn!(error = %e, "Map refresh handler ended abnormally");
    }
    // The handler may have stopped before its last reload
    if let LoadOutcome::Installed { markers, .. } = loader.load_all().await {
        println!("{} photo(s) on the map", markers);
    }

    if outcome.ingested == 0 && outcome.batches_failed > 0 {
        bail!("Upload failed.");
    }
    Ok(())
}

async fn run_map(config: &ClientConfig, catalog: Arc<dyn CatalogSource>, debug_log: DebugLog) -> Result<()> {
    let layer = Arc::new(MarkerLayer::new());
    let loader = GeoPageLoader::new(catalog, layer.clone(), config.geo_page_size, debug_log);

    match loader.load_all().await {
        LoadOutcome::Installed { markers, pages, bounds } => {
            for marker in layer.markers() {
                println!(
                    "{:>6}  {:>11.6}  {:>11.6}  {}",
                    marker.record.id,
                    marker.lat,
                    marker.lng,
                    marker.tooltip_url().unwrap_or(&marker.record.file_path)
                );
            }
            println!("{} marker(s) from {} page(s)", markers, pages);
            if let Some(b) = bounds {
                let (lat, lng) = b.center();
                println!("Bounds: S {:.6} W {:.6} N {:.6} E {:.6}", b.south, b.west, b.north, b.east);
                println!("Center: {:.6}, {:.6}", lat, lng);
            }
            Ok(())
        }
        LoadOutcome::Superseded => Ok(()),
        LoadOutcome::Failed(reason) => bail!("Map load failed: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event(payload: SyncEventPayload) -> SyncEvent {
        SyncEvent::new(1, "upload", payload)
    }

    #[test]
    fn test_batch_lines_are_numbered_from_one() {
        let first = event(SyncEventPayload::BatchIngested {
            session_id: Uuid::nil(),
            batch_index: 0,
            batches_total: 3,
            accepted: 16,
        });
        assert_eq!(describe_event(&first).unwrap(), "Batch 1/3: 16 file(s) ingested");

        let failed = event(SyncEventPayload::BatchFailed {
            session_id: Uuid::nil(),
            batch_index: 1,
            reason: "status 500".to_string(),
        });
        assert_eq!(describe_event(&failed).unwrap(), "Batch 2 failed, continuing");
    }

    #[test]
    fn test_completion_ends_reporting() {
        let done = event(SyncEventPayload::SessionCompleted {
            session_id: Uuid::nil(),
            ingested: 3,
            files_total: 3,
        });
        assert!(describe_event(&done).is_none());
    }
}
