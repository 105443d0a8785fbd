use std::future::Future;
use std::io::BufRead;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::console::{self, LoopCommand};
use crate::core::{
    asset_cache::{AssetCache, HttpAssetSource},
    collaborators::{LogRenderer, LogStatusDisplay, LogViewport},
    config::{ConfigManager, SettingsStore},
    coordinator::Coordinator,
    error::{CacheError, FeedError},
    event_log::{EventLog, Severity},
    feed::{FileFeed, HttpFeed, TargetFeed},
    geo::Coord,
    model::Target,
};

#[derive(Parser, Debug)]
#[command(
    name = "tactical-monitor",
    version,
    about = "Polls a target feed and raises geofenced threat alerts"
)]
pub struct Cli {
    /// Target feed URL returning a JSON array of targets
    #[arg(long, required_unless_present = "feed_file", conflicts_with = "feed_file")]
    pub feed_url: Option<String>,

    /// Read targets from a local JSON file instead of HTTP
    #[arg(long)]
    pub feed_file: Option<PathBuf>,

    /// Directory holding settings.json
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Seconds between refreshes
    #[arg(long, default_value_t = 5)]
    pub interval_secs: u64,

    /// Operator latitude
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Operator longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Enable the offline asset cache under this directory
    #[arg(long)]
    pub asset_cache_dir: Option<PathBuf>,

    #[arg(long, default_value = "v1")]
    pub cache_version: String,

    /// Asset URL to pre-cache (repeatable)
    #[arg(long = "precache")]
    pub precache: Vec<String>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Target>, FeedError>> + 'a>>;
type PendingFetch<'a> = (u64, FetchFuture<'a>);

/// Everything the loop owns. Nothing here is shared across tasks.
struct Monitor {
    settings: SettingsStore,
    coordinator: Coordinator,
    event_log: EventLog,
    renderer: LogRenderer,
    viewport: LogViewport,
    display: LogStatusDisplay,
}

impl Monitor {
    fn new(cli: &Cli) -> Self {
        let settings = SettingsStore::open(ConfigManager::new(cli.config_dir.clone()));
        let mut coordinator = Coordinator::new();
        if let (Some(lat), Some(lng)) = (cli.lat, cli.lng) {
            coordinator.set_user_position(Some(Coord::new(lat, lng)));
        }
        Self {
            settings,
            coordinator,
            event_log: EventLog::new(),
            renderer: LogRenderer::new(),
            viewport: LogViewport::default(),
            display: LogStatusDisplay::default(),
        }
    }

    fn start_refresh<'a, F: TargetFeed>(
        &mut self,
        feed: &'a F,
        pending: &mut Option<PendingFetch<'a>>,
    ) {
        match self.coordinator.begin_refresh() {
            Some(generation) => *pending = Some((generation, Box::pin(feed.fetch()))),
            None => log::debug!("Refresh still in flight, skipping trigger"),
        }
    }

    fn finish_refresh(&mut self, generation: u64, fetched: Result<Vec<Target>, FeedError>) {
        // Settings are read now, not when the fetch was issued
        let settings = self.settings.get();
        let Some(output) =
            self.coordinator.complete_refresh(generation, fetched, settings, Utc::now())
        else {
            return;
        };
        // Removals and sync errors first, so this cycle's threats end up newest
        for entry in output.logs.iter().cloned() {
            self.event_log.push(entry);
        }
        output.forward(
            &mut self.renderer,
            &mut self.event_log,
            &mut self.viewport,
            &mut self.display,
        );
    }

    /// Applies a command and starts a refresh if it asked for one and none is in flight.
    fn on_command<'a, F: TargetFeed>(
        &mut self,
        command: LoopCommand,
        feed: &'a F,
        pending: &mut Option<PendingFetch<'a>>,
    ) {
        if self.handle_command(command) {
            self.start_refresh(feed, pending);
        }
    }

    /// Applies an operator command. Returns true when it asks for a refresh.
    fn handle_command(&mut self, command: LoopCommand) -> bool {
        match command {
            LoopCommand::SetRadius(km) => {
                if let Some(radius) = self.settings.set_alert_radius(km) {
                    self.coordinator.clear_alerts();
                    self.event_log
                        .record(Severity::Info, format!("RADIUS: {radius} KM"));
                    return true;
                }
            }
            LoopCommand::Alerts(switch) => {
                let enabled = switch.apply(self.settings.get().alerts_enabled);
                self.settings.set_alerts_enabled(enabled);
                self.event_log
                    .record(Severity::Warning, format!("ALERTS: {}", on_off(enabled)));
            }
            LoopCommand::AutoFocus(switch) => {
                let enabled = switch.apply(self.settings.get().auto_focus_enabled);
                self.settings.set_auto_focus_enabled(enabled);
                self.event_log
                    .record(Severity::Warning, format!("AUTOFOCUS: {}", on_off(enabled)));
            }
            LoopCommand::Position(coord) => {
                self.coordinator.set_user_position(Some(coord));
                self.event_log.record(
                    Severity::Info,
                    format!("POSITION: {:.4}, {:.4}", coord.lat, coord.lng),
                );
            }
            LoopCommand::Refresh => return true,
            LoopCommand::Targets => {
                for summary in self.coordinator.target_summaries() {
                    let distance = summary
                        .distance_km
                        .map_or_else(|| "--".to_string(), |d| format!("{d:.1}"));
                    println!(
                        "{:<12} {:<10} {:<24} {:>8} km  {:.2} {:.2}",
                        summary.target.id,
                        summary.target.kind,
                        summary.target.display_label(),
                        distance,
                        summary.target.lat,
                        summary.target.lng
                    );
                }
            }
            LoopCommand::Status => {
                let settings = self.settings.get();
                println!("{}", self.coordinator.status().summary());
                println!(
                    "radius {} km | alerts {} | autofocus {} | open alerts {} | markers {}",
                    settings.alert_radius,
                    on_off(settings.alerts_enabled),
                    on_off(settings.auto_focus_enabled),
                    self.coordinator.alert_state().len(),
                    self.renderer.marker_count()
                );
            }
            LoopCommand::ShowLog => {
                for entry in self.event_log.entries() {
                    println!("[{}] {}", entry.at.format("%H:%M:%S"), entry.text);
                }
            }
            LoopCommand::Help => println!("{}", console::HELP),
        }
        false
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

async fn wait_pending(
    pending: &mut Option<PendingFetch<'_>>,
) -> (u64, Result<Vec<Target>, FeedError>) {
    match pending.as_mut() {
        Some((generation, fetch)) => {
            let generation = *generation;
            let result = fetch.as_mut().await;
            *pending = None;
            (generation, result)
        }
        None => std::future::pending().await,
    }
}

// Stdin reads cannot be cancelled, so they live on a detached thread that
// never holds up runtime shutdown.
fn read_console(tx: mpsc::Sender<LoopCommand>) {
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match console::parse_command(&line) {
                    Ok(command) => {
                        if tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Err(message) => eprintln!("{message}"),
                }
            }
        });
    if let Err(e) = spawned {
        log::warn!("Console input unavailable: {e}");
    }
}

async fn prepare_asset_cache(root: PathBuf, version: String, urls: Vec<String>) {
    let result = tokio::task::spawn_blocking(move || -> Result<(usize, Vec<String>), CacheError> {
        let cache = AssetCache::new(root, &version);
        let source = HttpAssetSource::new()?;
        let cached = cache.install(&source, &urls)?;
        let purged = cache.activate()?;
        Ok((cached, purged))
    })
    .await;

    match result {
        Ok(Ok((cached, purged))) => {
            log::info!(
                "Asset cache ready: {cached} cached, {} stale namespaces purged",
                purged.len()
            );
        }
        Ok(Err(e)) => log::warn!("Asset cache unavailable: {e}"),
        Err(e) => log::warn!("Asset cache task failed: {e}"),
    }
}

async fn monitor<F: TargetFeed>(feed: F, cli: Cli) {
    let mut state = Monitor::new(&cli);

    if let Some(root) = cli.asset_cache_dir.clone() {
        prepare_asset_cache(root, cli.cache_version.clone(), cli.precache.clone()).await;
    }

    let (tx, mut rx) = mpsc::channel(32);
    read_console(tx);
    let mut console_open = true;

    let mut interval = tokio::time::interval(Duration::from_secs(cli.interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut pending: Option<PendingFetch<'_>> = None;
    log::info!("Monitor started, refreshing every {}s", cli.interval_secs.max(1));

    loop {
        tokio::select! {
            _ = interval.tick() => state.start_refresh(&feed, &mut pending),
            command = rx.recv(), if console_open => match command {
                Some(command) => state.on_command(command, &feed, &mut pending),
                None => console_open = false,
            },
            (generation, fetched) = wait_pending(&mut pending) => {
                state.finish_refresh(generation, fetched);
            }
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // One cooperative loop; blocking work goes to the blocking pool
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        if let Some(path) = cli.feed_file.clone() {
            log::info!("Reading targets from {}", path.display());
            monitor(FileFeed::new(path), cli).await;
            return;
        }
        let Some(url) = cli.feed_url.clone() else {
            log::error!("No feed configured");
            return;
        };
        match HttpFeed::new(&url) {
            Ok(feed) => {
                log::info!("Polling {}", feed.url());
                monitor(feed, cli).await;
            }
            Err(e) => log::error!("Cannot create feed client: {e}"),
        }
    });
    runtime.shutdown_background();
}
