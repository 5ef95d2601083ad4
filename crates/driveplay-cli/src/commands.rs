//! CLI command implementations

use crate::output::{self, OutputFormat, StrategyRow};
use driveplay_core::scripted::parse_script;
use driveplay_core::{
    open_playlist, playable_items, CatalogProvider, ControllerConfig, FallbackStatus, HttpCatalog,
    JsonCatalog, PlayableItem, ScriptStep, ScriptedSurfaceFactory, Snapshot, Strategy,
};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

/// How long the event stream must stay quiet before the run is checked for rest
const QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Load the controller configuration, falling back to defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ControllerConfig> {
    match path {
        Some(path) => {
            let config = ControllerConfig::from_json_file(path)?;
            info!(path = %path.display(), "Loaded controller configuration");
            Ok(config)
        }
        None => Ok(ControllerConfig::default()),
    }
}

fn catalog_for(source: &str) -> anyhow::Result<Box<dyn CatalogProvider>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let base = Url::parse(source)?;
        Ok(Box::new(HttpCatalog::new(base)?))
    } else {
        Ok(Box::new(JsonCatalog::new(source)))
    }
}

async fn load_items(source: &str, folder: &str) -> anyhow::Result<Vec<PlayableItem>> {
    let files = catalog_for(source)?.list(folder).await?;
    let total = files.len();
    let items = playable_items(files);
    info!(source, total, playable = items.len(), "Catalog loaded");
    Ok(items)
}

/// List the playable items of a catalog
pub async fn inspect(source: &str, folder: &str, format: &str) -> anyhow::Result<()> {
    let items = load_items(source, folder).await?;
    print!("{}", output::render_items(&items, OutputFormat::from(format)));
    if OutputFormat::from(format) != OutputFormat::Text {
        println!();
    }
    Ok(())
}

/// Show every source the ladder would try for an item
pub fn strategies(item_id: &str, config: &ControllerConfig, format: &str) -> anyhow::Result<()> {
    let rows = Strategy::LADDER
        .into_iter()
        .map(|strategy| -> driveplay_core::Result<StrategyRow> {
            Ok(StrategyRow {
                index: strategy.index(),
                strategy,
                surface: strategy.surface_kind().to_string(),
                controls: strategy.controls_available(),
                url: config.strategies.resolve(item_id, strategy)?,
            })
        })
        .collect::<driveplay_core::Result<Vec<_>>>()?;

    let format = OutputFormat::from(format);
    if format == OutputFormat::Text {
        println!("Sources for {}:", item_id);
    }
    println!("{}", output::render_strategies(rows, format).trim_end());
    Ok(())
}

/// Arguments of a scripted playback run
pub struct SimulateArgs {
    pub source: String,
    pub folder: String,
    pub initial: Option<String>,
    pub script: String,
    pub then: String,
    pub load_timeout_ms: Option<u64>,
    pub max_duration: u64,
}

/// Nothing more will happen without user input
fn is_at_rest(snapshot: &Snapshot) -> bool {
    if snapshot.closed {
        return true;
    }
    !snapshot.auto_advance_pending
        && matches!(
            snapshot.status,
            Some(FallbackStatus::Settled) | Some(FallbackStatus::Exhausted)
        )
}

/// Drive a playlist through the real controller with scripted surfaces
pub async fn simulate(
    args: SimulateArgs,
    mut config: ControllerConfig,
    format: &str,
) -> anyhow::Result<()> {
    let format = OutputFormat::from(format);
    if let Some(ms) = args.load_timeout_ms {
        config.load_timeout_ms = Some(ms);
    }

    let items = load_items(&args.source, &args.folder).await?;
    let script = parse_script(&args.script)?;
    let then: ScriptStep = args.then.parse()?;
    let factory = ScriptedSurfaceFactory::new(script, then);
    let log = factory.log();

    let Some(handle) = open_playlist(items, args.initial.as_deref(), config, factory)? else {
        println!("Nothing to play: the catalog has no playable items");
        return Ok(());
    };
    let mut events = handle.events();
    println!("{}", output::render_snapshot(&handle.current(), format));

    let deadline = Instant::now() + Duration::from_secs(args.max_duration);
    loop {
        match tokio::time::timeout(QUIET_PERIOD, events.recv()).await {
            Ok(Ok(record)) => println!("{}", output::render_event(&record, format)),
            Ok(Err(RecvError::Lagged(skipped))) => warn!(skipped, "Event stream lagged"),
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => {
                if is_at_rest(&handle.snapshot().await?) {
                    break;
                }
            }
        }
        if Instant::now() >= deadline {
            warn!(max_duration = args.max_duration, "Giving up before the playlist came to rest");
            break;
        }
    }

    let snapshot = handle.snapshot().await?;
    handle.close().await?;
    println!("{}", output::render_snapshot(&snapshot, format));
    info!(mounts = log.len(), "Simulation finished");

    if snapshot.status == Some(FallbackStatus::Exhausted) {
        anyhow::bail!("no source could be played for '{}'", snapshot.title.unwrap_or_default());
    }
    Ok(())
}
