//! ALFA Slideshow - CLI
//!
//! Terminal front-end: present files or saved collections, manage the
//! collection store and the presentation settings.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use alfa_slideshow::settings::{AdvanceInterval, AutoLockDelay};
use alfa_slideshow::{
    platform_bridge, Collection, CollectionStore, Disposition, ExitIntent, MediaSource,
    PlatformServices, PreviewEngine, SessionCommand, SessionConfig, SessionController,
    SessionEvent, SessionHandle, SessionNotice, SessionRuntime, SqliteCollectionStore,
};

#[derive(Parser)]
#[command(name = "alfa-slideshow")]
#[command(author = "Karen Tonoyan")]
#[command(version = alfa_slideshow::VERSION)]
#[command(about = "ALFA Slideshow - Secure presentation with device lock on exit")]
struct Cli {
    /// Collection database
    #[arg(long, default_value = "./slideshow.db")]
    db: PathBuf,

    /// Settings file
    #[arg(long, default_value = "./slideshow.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Present files or directories as an unsaved collection
    Play {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Present a saved collection
    Open {
        /// Collection ID
        id: String,

        /// Start at this position (1-based)
        #[arg(long, default_value_t = 1)]
        at: usize,
    },

    /// List saved collections
    List,

    /// Delete a saved collection
    Delete {
        /// Collection ID
        id: String,
    },

    /// Rename a saved collection
    Rename {
        /// Collection ID
        id: String,

        /// New name
        name: String,
    },

    /// Show or change presentation settings
    Config {
        #[arg(long)]
        auto_advance: Option<bool>,

        /// Seconds: 3, 5, 10 or 30
        #[arg(long)]
        interval: Option<u64>,

        #[arg(long)]
        auto_lock: Option<bool>,

        /// Minutes: 1, 2, 5, 10 or 15
        #[arg(long)]
        lock_minutes: Option<u64>,

        #[arg(long)]
        confirm_removal: Option<bool>,

        #[arg(long)]
        swipe: Option<bool>,

        /// Swipe velocity threshold, px/s
        #[arg(long)]
        velocity: Option<f32>,

        #[arg(long)]
        counter: Option<bool>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Play { paths, recursive } => {
            let ingested = MediaSource::new()
                .recursive(recursive)
                .ingest(&paths)
                .context("Cannot build collection")?;

            if !ingested.rejected.is_empty() {
                println!("⏭️ Skipped {} unsupported file(s)", ingested.rejected.len());
            }

            let store = SqliteCollectionStore::open(&cli.db)?;
            let config = SessionConfig::load_or_default(&cli.config);
            present(ingested.collection, 0, config, store)
        }

        Commands::Open { id, at } => {
            let store = SqliteCollectionStore::open(&cli.db)?;
            let collection = store.load(&id)?;
            let config = SessionConfig::load_or_default(&cli.config);
            present(collection, at.saturating_sub(1), config, store)
        }

        Commands::List => {
            let store = SqliteCollectionStore::open(&cli.db)?;
            let collections = store.list_all()?;

            if collections.is_empty() {
                println!("📭 No saved collections");
            } else {
                println!("🖼️ Collections ({}):", collections.len());
                println!("{:-<60}", "");
                for collection in collections {
                    println!(
                        "{} - {} ({} items, updated {})",
                        collection.id,
                        collection.name,
                        collection.len(),
                        collection.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Ok(())
        }

        Commands::Delete { id } => {
            let store = SqliteCollectionStore::open(&cli.db)?;
            store.remove(&id)?;
            println!("✅ Collection deleted");
            Ok(())
        }

        Commands::Rename { id, name } => {
            let store = SqliteCollectionStore::open(&cli.db)?;
            store.rename(&id, &name)?;
            println!("✅ Collection renamed");
            Ok(())
        }

        Commands::Config {
            auto_advance,
            interval,
            auto_lock,
            lock_minutes,
            confirm_removal,
            swipe,
            velocity,
            counter,
        } => {
            let mut config = SessionConfig::load_or_default(&cli.config);
            let mut changed = false;

            if let Some(value) = auto_advance {
                config.auto_advance_enabled = value;
                changed = true;
            }
            if let Some(seconds) = interval {
                match AdvanceInterval::from_seconds(seconds) {
                    Some(value) => config.advance_interval = value,
                    None => bail!("Interval must be one of 3, 5, 10, 30 seconds"),
                }
                changed = true;
            }
            if let Some(value) = auto_lock {
                config.auto_lock_enabled = value;
                changed = true;
            }
            if let Some(minutes) = lock_minutes {
                match AutoLockDelay::from_minutes(minutes) {
                    Some(value) => config.auto_lock_delay = value,
                    None => bail!("Auto-lock delay must be one of 1, 2, 5, 10, 15 minutes"),
                }
                changed = true;
            }
            if let Some(value) = confirm_removal {
                config.confirm_removal = value;
                changed = true;
            }
            if let Some(value) = swipe {
                config.swipe_to_delete_enabled = value;
                changed = true;
            }
            if let Some(value) = velocity {
                if !value.is_finite() || value <= 0.0 {
                    bail!("Velocity threshold must be positive");
                }
                config.swipe_velocity_threshold = value;
                changed = true;
            }
            if let Some(value) = counter {
                config.show_counter = value;
                changed = true;
            }

            if changed {
                config.save(&cli.config)?;
                println!("✅ Settings saved to {}", cli.config.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERACTIVE PRESENTATION
// ═══════════════════════════════════════════════════════════════════════════════

const HELP: &str = "\
Commands:
  n / Enter      next          p          previous
  g <k>          go to item k  d          remove current
  y / no         answer removal confirmation
  q              exit          b          back
  x              lock and leave immediately
  save <name>    save on exit  discard    cancel
  retry          retry a failed save
  abandon        leave without saving after a failed save";

fn present(
    collection: Collection,
    start: usize,
    config: SessionConfig,
    store: SqliteCollectionStore,
) -> anyhow::Result<()> {
    let show_counter = config.show_counter;
    let services = PlatformServices {
        lock_bridge: platform_bridge(),
        store: Arc::new(store),
        loader: Arc::new(PreviewEngine::default()),
    };
    let controller = SessionController::new(collection, config, services)?.with_start_index(start);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    println!("{}", HELP);

    runtime.block_on(async move {
        let (session, handle, mut events) = SessionRuntime::new(controller);
        let input = tokio::spawn(read_commands(handle));

        let printer = async move {
            while let Some(event) = events.recv().await {
                print_event(&event, show_counter);
            }
        };

        tokio::join!(session.run(), printer);
        input.abort();
    });

    // stdin reads run on a blocking thread that may never return
    runtime.shutdown_background();
    Ok(())
}

async fn read_commands(handle: SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match parse_command(&line) {
            Some(command) => {
                if handle.send(command).await.is_err() {
                    return;
                }
            }
            None => println!("{}", HELP),
        }
    }

    let _ = handle.send(SessionCommand::Shutdown).await;
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "" | "n" | "next" => SessionCommand::Next,
        "p" | "prev" => SessionCommand::Previous,
        "g" | "goto" => SessionCommand::JumpTo(rest.parse::<usize>().ok()?.checked_sub(1)?),
        "d" | "del" => SessionCommand::RemoveCurrent,
        "y" | "yes" => SessionCommand::ConfirmRemoval(true),
        "no" => SessionCommand::ConfirmRemoval(false),
        "q" | "quit" => SessionCommand::Exit(ExitIntent::Control),
        "b" | "back" => SessionCommand::Exit(ExitIntent::Back),
        "x" => SessionCommand::Exit(ExitIntent::Immediate),
        "save" => SessionCommand::Choose(Disposition::Save { name: rest.to_string() }),
        "discard" => SessionCommand::Choose(Disposition::Discard),
        "cancel" => SessionCommand::Choose(Disposition::Cancel),
        "retry" => SessionCommand::RetrySave,
        "abandon" => SessionCommand::DiscardUnsaved,
        _ => return None,
    };

    Some(command)
}

fn print_event(event: &SessionEvent, show_counter: bool) {
    let notice = match event {
        SessionEvent::Notice(notice) => notice,
        SessionEvent::Rejected { reason, .. } => {
            println!("⚠️ {}", reason);
            return;
        }
    };

    match notice {
        SessionNotice::Started { total, .. } => println!("🎞️ Presenting {} item(s)", total),
        SessionNotice::SlideChanged { cursor, total, item } => {
            if show_counter {
                println!("▶ {} / {}  {}", cursor + 1, total, item.display_name());
            } else {
                println!("▶ {}", item.display_name());
            }
        }
        SessionNotice::ConfirmRemoval { item, .. } => {
            println!("🗑️ Remove {} from this collection? (y / no)", item.display_name());
        }
        SessionNotice::RemovalCancelled => println!("↩️ Kept"),
        SessionNotice::Removed { item, remaining } => {
            println!("🗑️ Removed {} ({} left)", item.display_name(), remaining);
        }
        SessionNotice::RemovalFailed { reason } => println!("⚠️ Not removed: {}", reason),
        SessionNotice::SessionEnded => println!("📭 Collection is empty"),
        SessionNotice::LockAttempted { outcome, .. } => {
            if outcome.is_confirmed() {
                println!("🔒 Device locked");
            } else {
                println!("🔓 Device lock not confirmed");
            }
        }
        SessionNotice::AutoLockCapabilityRequested => {
            println!("🔐 Auto-lock needs the lock permission to be granted");
        }
        SessionNotice::PhaseChanged { phase } => log::debug!("Phase: {:?}", phase),
        SessionNotice::DispositionRequired => {
            println!("💾 Unsaved collection: save <name> / discard / cancel");
        }
        SessionNotice::SaveFailed { reason } => {
            println!("❌ Save failed: {} (retry / abandon)", reason);
        }
        SessionNotice::Resumed => println!("▶️ Resumed"),
        SessionNotice::Exited { saved } => match saved {
            Some(id) => println!("✅ Saved as {}", id),
            None => println!("👋 Presentation closed"),
        },
    }
}
