//! Visage Player - digital human playback console
//!
//! Drives an avatar through the software backend from the command line:
//! loads a model from the local store, plays WAV files (16kHz/16-bit/mono
//! with a 44-byte header), and triggers motion clips.
//!
//! ## Command line flags
//!
//! - `--model <source>`: model name or download URL (overrides config)
//! - `--motion <name>`: start a motion before playback
//! - `--random-motion`: start a random motion before playback
//! - `--volume <v>`: output volume, 0.0 to 1.0
//! - `--prepare`: scaffold a demo model store and config, then exit

mod config;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossbeam::channel::Receiver;

use visage_core::backend::NullBackend;
use visage_core::engine::PlaybackEvent;
use visage_core::model::{ModelStore, BASE_RES};
use visage_core::Avatar;

#[derive(Default)]
struct Args {
    model: Option<String>,
    motion: Option<String>,
    random_motion: bool,
    volume: Option<f32>,
    prepare: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--model" => args.model = Some(iter.next().context("--model needs a value")?),
            "--motion" => args.motion = Some(iter.next().context("--motion needs a value")?),
            "--random-motion" => args.random_motion = true,
            "--volume" => {
                let value = iter.next().context("--volume needs a value")?;
                args.volume = Some(value.parse().context("--volume needs a number")?);
            }
            "--prepare" => args.prepare = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown flag {} (try --help)", flag),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!("Usage: visage-player [flags] [file.wav ...]");
    println!();
    println!("Flags:");
    println!("  --model <source>   model name or download URL (default from config)");
    println!("  --motion <name>    start a motion before playback");
    println!("  --random-motion    start a random motion before playback");
    println!("  --volume <v>       output volume, 0.0 to 1.0");
    println!("  --prepare          scaffold a demo model store and config, then exit");
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    println!("╔══════════════════════════════════════════════════╗");
    println!("║                  Visage Player                   ║");
    println!("║          digital human playback console          ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    let config_path = config::default_config_path();
    let player_config: config::PlayerConfig = visage_core::config::load_config(&config_path);
    let store = ModelStore::new(&player_config.store_root);
    let model = args.model.clone().unwrap_or_else(|| player_config.model.clone());

    if args.prepare {
        prepare_store(&store, &model)?;
        if !config_path.exists() {
            let mut saved = player_config.clone();
            saved.model = model;
            visage_core::config::save_config(&saved, &config_path)?;
            println!("Wrote default config to {}", config_path.display());
        }
        return Ok(());
    }

    let (tx, rx) = crossbeam::channel::unbounded();
    let listener = Box::new(move |event: PlaybackEvent| {
        match &event {
            PlaybackEvent::InitSucceeded(info) => {
                log::info!("ready: '{}' {}x{}", info.name, info.width, info.height)
            }
            PlaybackEvent::InitFailed {
                code,
                subcode,
                message,
            } => log::error!("init failed ({}:{}): {}", code, subcode, message),
            PlaybackEvent::AudioPlayStarted => log::info!("audio started"),
            PlaybackEvent::AudioPlayEnded => log::info!("audio ended"),
            PlaybackEvent::AudioPlayFailed { code, message } => {
                log::error!("audio failed ({}): {}", code, message)
            }
            PlaybackEvent::MotionStarted { name } => log::info!("motion '{}' started", name),
            PlaybackEvent::MotionCompleted { name } => log::info!("motion '{}' completed", name),
        }
        let _ = tx.send(event);
    });

    let mut avatar = Avatar::with_backend(
        player_config.engine,
        store,
        Box::new(NullBackend::new()),
        listener,
    )?;

    avatar.initialize(&model);
    match rx.recv_timeout(Duration::from_secs(10)) {
        Ok(PlaybackEvent::InitSucceeded(info)) => {
            println!(
                "Model '{}' ready ({}x{}, {} motions)",
                info.name,
                info.width,
                info.height,
                info.motions.len()
            );
        }
        Ok(PlaybackEvent::InitFailed { message, .. }) => {
            bail!(
                "initialization failed: {} (run with --prepare to scaffold a demo store)",
                message
            );
        }
        Ok(other) => bail!("unexpected event before init: {:?}", other),
        Err(_) => bail!("timed out waiting for initialization"),
    }

    if let Some(volume) = args.volume {
        avatar.set_volume(volume);
    }

    if let Some(name) = &args.motion {
        avatar.motion().start(name, true);
    } else if args.random_motion {
        avatar.motion().start_random(true);
    }

    if args.files.is_empty() && args.motion.is_none() && !args.random_motion {
        println!("Nothing to play; pass WAV files or a motion flag (see --help).");
    }

    for file in &args.files {
        println!("Playing {}", file.display());
        if !avatar.audio().play_file(file) {
            log::error!("skipped {}", file.display());
            continue;
        }
        wait_for_play_end(&rx)?;
    }

    if args.motion.is_some() || args.random_motion {
        wait_for_motion_end(&rx);
    }

    avatar.release();
    println!("Done.");
    Ok(())
}

fn wait_for_play_end(rx: &Receiver<PlaybackEvent>) -> Result<()> {
    loop {
        match rx.recv_timeout(Duration::from_secs(30)) {
            Ok(PlaybackEvent::AudioPlayEnded) => return Ok(()),
            Ok(PlaybackEvent::AudioPlayFailed { code, message }) => {
                bail!("playback failed ({}): {}", code, message)
            }
            Ok(_) => {}
            Err(_) => bail!("timed out waiting for playback to finish"),
        }
    }
}

/// Give an in-flight motion a few seconds to run out; never fatal
fn wait_for_motion_end(rx: &Receiver<PlaybackEvent>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(PlaybackEvent::MotionCompleted { .. }) => return,
            Ok(_) => {}
            Err(_) => return,
        }
    }
}

/// Scaffold the store layout the model resolver checks for, with a demo
/// model the software backend can load
fn prepare_store(store: &ModelStore, model: &str) -> Result<()> {
    let name = ModelStore::model_name(model)?;

    for package in [BASE_RES, name.as_str()] {
        let dir = store.model_dir(package);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let marker = store.marker(package);
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&marker, b"ok")
            .with_context(|| format!("failed to write {}", marker.display()))?;
    }

    let meta = format!(
        r#"{{"name": "{}", "width": 540, "height": 960, "motions": ["wave", "nod", "bow"]}}"#,
        name
    );
    let meta_path = store.model_dir(&name).join("model.json");
    std::fs::write(&meta_path, meta)
        .with_context(|| format!("failed to write {}", meta_path.display()))?;

    println!("Prepared model '{}' under {}", name, store.root().display());
    Ok(())
}
