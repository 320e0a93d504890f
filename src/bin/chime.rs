//! Console host for the chime reminder core.
//!
//! Stands in for a chat transport: commands arrive as stdin lines and
//! alerts go to stdout. Each user's timers are persisted as JSON under
//! the configured data directory after every mutation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use chime::core::format::unit_str;
use chime::features::timers::{
    timer_help, Notifier, Presence, SweepScheduler, Timer, TimerRegistry, TimerStore,
};
use chime::Config;

/// The single seat at the console.
const USER: &str = "console";

struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, _user: &str, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// The user at the keyboard is always reachable.
struct AlwaysPresent;

impl Presence for AlwaysPresent {
    fn is_notifiable(&self, _user: &str) -> bool {
        true
    }
}

/// One JSON file per user under the data directory.
struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data dir {}", dir.display()))?;
        Ok(JsonFileStore { dir })
    }

    fn path_for(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{user}.json"))
    }

    fn load(&self, user: &str) -> Result<Vec<Timer>> {
        let path = self.path_for(user);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("corrupt timer file {}", path.display()))
    }
}

impl TimerStore for JsonFileStore {
    fn persist(&self, user: &str, timers: &[Timer]) -> Result<()> {
        let path = self.path_for(user);
        let raw = serde_json::to_string_pretty(timers)?;
        std::fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    info!(
        "starting chime console host (data dir: {})",
        config.data_dir.display()
    );

    let store = Arc::new(JsonFileStore::new(config.data_dir.clone())?);
    let registry = Arc::new(TimerRegistry::new(store.clone(), config.realert_interval));

    let restored = store.load(USER)?;
    if !restored.is_empty() {
        info!("restored {} timer(s) for {USER}", restored.len());
        registry.restore(USER, restored);
    }

    SweepScheduler::new(
        registry.clone(),
        Arc::new(StdoutNotifier),
        Arc::new(AlwaysPresent),
        config.sweep_interval,
    )
    .spawn();

    let started_at = Utc::now();
    println!("chime ready. Type 'help' for timer syntax, 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match respond(&registry, started_at, line.trim(), Utc::now()) {
            Some(reply) => {
                if !reply.is_empty() {
                    println!("{reply}");
                }
            }
            None => break,
        }
    }

    Ok(())
}

/// Dispatch one console line; `None` means quit.
fn respond(
    registry: &TimerRegistry,
    started_at: DateTime<Utc>,
    line: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    if line.is_empty() {
        return Some(String::new());
    }
    if line.eq_ignore_ascii_case("quit") {
        return None;
    }
    if line.eq_ignore_ascii_case("help") {
        return Some(timer_help().to_string());
    }
    if line.eq_ignore_ascii_case("uptime") {
        return Some(format!("up {}", unit_str(now - started_at)));
    }
    if line.eq_ignore_ascii_case("show timers") {
        let timers = registry.timers_for(USER);
        if timers.is_empty() {
            return Some("No timers set.".to_string());
        }
        return Some(
            timers
                .iter()
                .map(|t| {
                    format!(
                        "- {}: {} ({})",
                        t.description,
                        t.target_str(now),
                        t.remaining_str(now)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if let Some(args) = strip_word(line, "timer") {
        if args.is_empty() {
            return Some(timer_help().to_string());
        }
        if let Some(description) = strip_word(args, "ack") {
            return Some(match registry.acknowledge(USER, description) {
                Ok(()) => "Timer acknowledged.".to_string(),
                Err(e) => e.to_string(),
            });
        }
        return Some(match registry.create(USER, args, now) {
            Ok(t) => format!(
                "Timer '{}' {} ({})",
                t.description,
                t.target_str(now),
                t.remaining_str(now)
            ),
            Err(e) => e.to_string(),
        });
    }

    Some(format!("I don't know '{line}'. Type 'help' for timer syntax."))
}

/// Strip a leading command word (case-insensitive) and the whitespace
/// after it; `None` when the line does not start with that word.
fn strip_word<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => head.eq_ignore_ascii_case(word).then(|| rest.trim_start()),
        None => line.eq_ignore_ascii_case(word).then_some(""),
    }
}
