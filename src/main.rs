// src/main.rs
//! `hires-scan`: resolves and indexes a texture pack the way the emulator would, optionally
//! prefetches it, and prints what was found.

use std::backtrace::Backtrace;
use std::fs::File;
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};

use hires_textures::{
    cache::format_bytes, resolve_directories, HiresConfig, HiresTextures, PrefetchOutcome, ReThreeMaskQuirks, Settings,
};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "hires-scan", version, about = "Inspect a custom texture pack for one game")]
struct Args {
    /// JSON config file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Texture root holding one folder per game
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Game identifier, e.g. GLEE08
    #[arg(short, long)]
    game_id: Option<String>,

    /// Decode every texture into the cache and report the total
    #[arg(long)]
    prefetch: bool,

    /// Fixed prefetch budget in bytes
    #[arg(long)]
    budget: Option<u64>,

    /// Print every registry entry
    #[arg(long)]
    list: bool,
}

fn main() {
    setup_diagnostics();

    if let Err(e) = run(Args::parse()) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => HiresConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => HiresConfig::default(),
    };
    if let Some(root) = args.root {
        config = config.with_root(root);
    }
    if let Some(game_id) = args.game_id {
        config = config.with_game_id(game_id);
    }
    if args.prefetch {
        config = config.with_cache(true);
    }
    if args.budget.is_some() {
        config.memory_budget = args.budget;
    }

    if config.game_id.is_empty() {
        bail!("no game id given (use --game-id or the config's game_id)");
    }
    if !config.root.is_dir() {
        bail!("texture root {} is not a directory", config.root.display());
    }

    let directories = resolve_directories(&config.root, &config.game_id);
    for dir in &directories {
        println!("folder  {}", dir.display());
    }

    let (hires, settings) = HiresTextures::from_config(&config);
    let hires = hires.with_name_override(Arc::new(ReThreeMaskQuirks::new()));
    hires.init();
    hires.update(&config.root, &config.game_id);
    info!("{} texture(s) indexed for {}", hires.registry_len(), config.game_id);

    if config.cache_enabled {
        match hires.wait_for_prefetch() {
            Some(PrefetchOutcome::Completed { bytes, elapsed }) => {
                println!("prefetched {} in {:.1}s", format_bytes(bytes), elapsed.as_secs_f64());
            }
            Some(PrefetchOutcome::BudgetExceeded { bytes }) => {
                println!(
                    "prefetch stopped at {}: over budget, hires textures now {}",
                    format_bytes(bytes),
                    if settings.hires_enabled() { "on" } else { "off" }
                );
            }
            Some(PrefetchOutcome::Cancelled { bytes }) => println!("prefetch cancelled at {}", format_bytes(bytes)),
            None => println!("no prefetch ran"),
        }
    }

    if args.list {
        let mut names = hires.registry_names();
        names.sort();
        for name in names {
            println!("  {name}");
        }
    }

    println!("textures {}", hires.registry_len());
    println!("{}", hires.cache_stats());

    hires.shutdown();
    Ok(())
}

/// Sets up logging and crash reports.
fn setup_diagnostics() {
    env_logger::Builder::new()
        .filter_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .format_timestamp_millis()
        .format_target(false)
        .parse_default_env()
        .init();

    panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::force_capture();

        let msg = match panic_info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<dyn Any>",
            },
        };

        let location = panic_info
            .location()
            .map_or("Unknown location".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));

        let crash_msg = format!(
            "=== hires-scan crash ===\nReason: {}\nLocation: {}\n\nStack Trace:\n{}",
            msg, location, backtrace
        );
        eprintln!("{}", crash_msg);

        if let Ok(mut file) = File::create("hires_scan_crash.log") {
            let _ = file.write_all(crash_msg.as_bytes());
            eprintln!("Crash report saved to hires_scan_crash.log");
        }
    }));
}
