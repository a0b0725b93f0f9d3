use std::cell::RefCell;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use interaction::{
    ClickFetcher, ClickReport, EventHub, Explorer, HeadlessPopup, HeadlessViewport,
    MemoryDownloads, Services, Session, SharedLayer, Snapshot, Surfaces, parse_session,
};
use layers::StyleTable;
use runtime::Frame;
use serde::Serialize;
use streaming::HttpCollections;
use tokio::task::{JoinHandle, LocalSet, spawn_local};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay recorded map events against the basin explorer")]
struct Args {
    /// Base URL of the collections API
    #[arg(long, env = "EXPLORER_API_BASE", default_value = HttpCollections::DEFAULT_BASE_URL)]
    api_base: String,

    /// Session file with one JSON event per line (`-` for stdin)
    #[arg(long, default_value = "-")]
    session: PathBuf,

    /// Simulated animation frame interval
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Let superseded requests finish instead of aborting them
    #[arg(long)]
    no_cancel: bool,
}

#[derive(Serialize)]
struct Summary {
    state: Snapshot,
    clicks: Vec<ClickReport>,
    styled_features: usize,
    live_downloads: usize,
    events: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()).await {
        error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_session(&args.session)?;
    let events = parse_session(&text)?;
    info!(events = events.len(), api = %args.api_base, "replaying session");

    let layer = SharedLayer::default();
    let downloads = MemoryDownloads::default();
    let engine = Explorer::new(
        StyleTable::default(),
        Surfaces {
            layer: Box::new(layer.clone()),
            viewport: Box::new(HeadlessViewport::default()),
            popup: Box::new(HeadlessPopup::default()),
            downloads: Box::new(downloads.clone()),
        },
    );
    let services = Services::shared(Rc::new(HttpCollections::new(args.api_base.clone())));
    let fetcher = if args.no_cancel {
        ClickFetcher::without_cancellation(services)
    } else {
        ClickFetcher::new(services)
    };

    let local = LocalSet::new();
    let summary = local
        .run_until(async move {
            let hub = EventHub::new();
            let tasks: Rc<RefCell<Vec<JoinHandle<ClickReport>>>> = Rc::default();
            let spawned = tasks.clone();
            let session = Session::attach(&hub, engine, fetcher, move |task| {
                spawned.borrow_mut().push(spawn_local(task));
            });

            let mut frame = Frame::new(0, 0.0);
            for event in events {
                hub.publish(event);
                frame = frame.next(args.frame_ms);
                session.tick(frame);
                // Give in-flight fetches a chance to settle between events.
                tokio::task::yield_now().await;
            }

            let mut clicks = Vec::new();
            let pending: Vec<_> = tasks.borrow_mut().drain(..).collect();
            for task in pending {
                match task.await {
                    Ok(report) => clicks.push(report),
                    Err(err) => warn!(error = %err, "click task failed"),
                }
            }
            session.tick(frame.next(args.frame_ms));

            let engine = session.engine();
            let engine = engine.borrow();
            let summary = Summary {
                state: engine.snapshot(),
                clicks,
                styled_features: layer.with(|l| l.override_count()),
                live_downloads: downloads.live_count(),
                events: engine
                    .events()
                    .events()
                    .map(|e| format!("#{} {}: {}", e.frame_index, e.kind, e.message))
                    .collect(),
            };
            summary
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn read_session(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}").into())
}
