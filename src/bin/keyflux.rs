// Keyflux CLI
// Grabs a keyboard, runs the remapping pipeline until interrupted

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;

use keyflux_core::input::device;
use keyflux_core::{
    CancelToken, CharacterSink, ConfigPaths, DispatchLoop, EventQueue, IngestLoop, Injector,
    LayoutDocument, LayoutEngine, PersistedState, SharedModifiers, DEFAULT_LAYOUT,
};

/// Layer-based keyboard remapper for Linux evdev
#[derive(Parser, Debug)]
#[command(name = "keyflux")]
#[command(version = "0.1.0")]
#[command(about = "Layer-based keyboard remapper for Linux evdev", long_about = None)]
struct Args {
    /// Configuration directory (defaults to $XDG_CONFIG_HOME/keyflux)
    #[arg(short, long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Layout to load, overriding the persisted selection
    #[arg(short, long, value_name = "NAME")]
    layout: Option<String>,

    /// List candidate keyboard devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Validate the layout file and exit
    #[arg(long)]
    check_layout: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn list_devices() -> anyhow::Result<()> {
    let candidates = device::list_candidates();
    if candidates.is_empty() {
        println!("No qualifying keyboard devices found");
        return Ok(());
    }
    for c in &candidates {
        let endpoint = c
            .endpoint
            .map(|e| e.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("score={:<4} endpoint={:<2} {}", c.score, endpoint, c.name);
    }
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let paths = match args.config_dir.clone() {
        Some(dir) => ConfigPaths::at(dir),
        None => ConfigPaths::discover()
            .ok_or_else(|| anyhow!("could not determine a configuration directory"))?,
    };
    paths.ensure().context("creating configuration directory")?;
    log::debug!("configuration root: {}", paths.root().display());

    let mut state = PersistedState::load(&paths.state_file());
    if let Some(name) = args.layout.clone() {
        state.layout = name;
    }
    if state.layout.is_empty() {
        state.layout = DEFAULT_LAYOUT.to_string();
    }

    let layout_path = paths.layout_file(&state.layout);
    let document = LayoutDocument::load(&layout_path, &state.layout)
        .with_context(|| format!("loading layout '{}'", state.layout))?;

    if !document.has_layer("base") {
        log::warn!("layout '{}' has no base layer; unresolved keys will be dropped", state.layout);
    }

    if args.check_layout {
        println!(
            "Layout '{}' is valid ({} keys, {} layers, {} layer keys)",
            document.name(),
            document.source_len(),
            document.layer_count(),
            document.layer_key_count()
        );
        return Ok(());
    }

    let engine = LayoutEngine::new(document, state, paths.state_file());

    let keyboard = device::acquire().context("acquiring keyboard")?;

    let cancel = CancelToken::new();
    install_signal_handler(cancel.clone())?;

    let queue = Arc::new(EventQueue::new());
    let modifiers = SharedModifiers::new();

    let ingest = IngestLoop::new(keyboard, queue.clone(), modifiers.clone(), cancel.clone());
    let ingest_handle = ingest.spawn();

    let sink = Injector::new().context("creating virtual output device")?;
    let dispatch = DispatchLoop::new(queue, engine, modifiers, sink, cancel.clone());

    let mut sink = dispatch.run();

    // Orderly shutdown: stop the producer, then make sure no modifier is
    // left pressed on the output side.
    cancel.cancel();
    if ingest_handle.join().is_err() {
        log::warn!("ingestion thread panicked during shutdown");
    }
    sink.release_all_modifiers();
    log::info!("shutdown complete");

    Ok(())
}

fn install_signal_handler(cancel: CancelToken) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handler")?;
    std::thread::spawn(move || {
        for signal in &mut signals {
            match signal {
                SIGINT | SIGTERM => {
                    log::info!("received signal {}, shutting down", signal);
                    cancel.cancel();
                    break;
                }
                _ => {}
            }
        }
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if args.list_devices {
        return list_devices();
    }

    run(args)
}
