//! CLI command implementations

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabled::Tabled;
use tokio::sync::mpsc;
use tracing::{info, warn};

use scrim_core::{
    setup_cache, CacheConfig, CatalogProvider, DiskCache, FileVersionStore, MediaHandle, MediaUrl,
    PlayerConfig, PlayerDelegate, PlayerRuntime, SimEngine, SimProfile, Status,
};

use crate::output::{format_rows, json_line, OutputFormat};

/// Entries served by the demo catalogue
const DEMO_CATALOG: &[(&str, &str)] = &[
    ("intro", "https://media.scrim.dev/intro.mp4"),
    ("trailer", "https://media.scrim.dev/trailer/master.m3u8"),
    ("feature", "https://media.scrim.dev/feature/master.m3u8"),
];

/// Simulated length of every demo item
const DEMO_DURATION_SECS: f64 = 20.0;

fn demo_catalog(engine: Arc<SimEngine>) -> CatalogProvider {
    let catalog = CatalogProvider::new(engine).with_lookup_delay(Duration::from_millis(150));
    for (id, url) in DEMO_CATALOG {
        catalog.insert(*id, *url);
    }
    catalog
}

/// Parseable URLs play directly, anything else is looked up as an id
fn parse_target(target: &str) -> MediaHandle {
    let url = MediaUrl::from(target);
    if url.to_url().is_some() {
        MediaHandle::Url(url)
    } else {
        MediaHandle::id(target)
    }
}

/// Forwards non-progress statuses to the command loop
struct Transitions(mpsc::UnboundedSender<Status>);

impl PlayerDelegate for Transitions {
    fn on_status(&self, status: &Status) {
        if status.progress().is_none() {
            let _ = self.0.send(status.clone());
        }
    }
}

#[derive(Serialize)]
struct Transition {
    at: DateTime<Utc>,
    elapsed_secs: f64,
    position: f64,
    status: Status,
}

/// Play a target through the simulated engine, printing each status change
pub async fn play(
    target: &str,
    seek: f64,
    config_path: Option<PathBuf>,
    run_for: u64,
    format: &str,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => PlayerConfig::from_file(&path)?,
        None => PlayerConfig::default(),
    };
    let engine = Arc::new(SimEngine::simulated(SimProfile {
        duration: DEMO_DURATION_SECS,
        ..Default::default()
    }));
    let provider = Arc::new(demo_catalog(engine));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let player = PlayerRuntime::new(config, provider)
        .with_delegate(Arc::new(Transitions(tx)))
        .spawn();
    let position = player.position();

    let handle = parse_target(target);
    let json = OutputFormat::from(format) == OutputFormat::Json;
    if !json {
        println!("Playing: {}", handle);
        if seek > 0.0 {
            println!("  Starting at {:.1}s", seek);
        }
    }

    let started = Instant::now();
    player.play(handle, seek)?;

    let stop = async {
        if run_for == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(run_for)).await
        }
    };
    tokio::pin!(stop);

    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut stop => {
                info!(run_for, "Run time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                break;
            }
            received = rx.recv() => {
                let Some(status) = received else { break };
                let transition = Transition {
                    at: Utc::now(),
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    position: *position.borrow(),
                    status,
                };
                if json {
                    println!("{}", json_line(&transition));
                } else {
                    println!(
                        "  [{:>7.2}s] {:<16} @ {:.2}s",
                        transition.elapsed_secs,
                        transition.status.to_string(),
                        transition.position
                    );
                }
                match transition.status {
                    Status::EndOfMedia => break,
                    Status::Failed(err) => {
                        failure = Some(err);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    player.shutdown().await?;
    if let Some(err) = failure {
        anyhow::bail!("playback failed: {}", err);
    }
    Ok(())
}

#[derive(Serialize, Tabled)]
struct CatalogRow {
    id: String,
    url: String,
}

/// List the demo catalogue
pub fn catalog(format: &str) -> anyhow::Result<()> {
    let catalog = demo_catalog(Arc::new(SimEngine::manual()));
    let rows: Vec<CatalogRow> = catalog
        .entries()
        .into_iter()
        .map(|(id, url)| CatalogRow {
            id: id.to_string(),
            url: url.to_string(),
        })
        .collect();

    println!("{}", format_rows(&rows, format));
    Ok(())
}

#[derive(Serialize, Tabled)]
struct CacheRow {
    dir: String,
    previous_version: u32,
    version: u32,
    cleaned: bool,
    usage_bytes: u64,
}

/// Run the version-gated cache setup against a directory
pub fn cache(dir: PathBuf, version_file: Option<PathBuf>, format: &str) -> anyhow::Result<()> {
    let version_file = version_file.unwrap_or_else(|| dir.join(".scrim-version.json"));
    let mut cache = DiskCache::new(&dir);
    let store = FileVersionStore::new(version_file);

    let setup = setup_cache(&mut cache, &store, &CacheConfig::default())?;
    let row = CacheRow {
        dir: dir.display().to_string(),
        previous_version: setup.previous_version,
        version: setup.version,
        cleaned: setup.cleaned,
        usage_bytes: cache.usage()?,
    };

    println!("{}", format_rows(&[row], format));
    Ok(())
}
