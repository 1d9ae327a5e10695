//! rotation-desk: request layer for the rotation engine.
//!
//! Usage:
//!   rotation-desk --db rotation.db --data-dir ./data            (status summary)
//!   rotation-desk --db rotation.db --data-dir ./data --ipc-mode (JSON lines on stdin)

use anyhow::Result;
use rotation_core::{
    config::RotationConfig,
    engine::RotationEngine,
    error::{ErrorKind, RotationError},
    roster::ParticipantPatch,
    store::RotationStore,
};
use serde_json::{json, Value};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Grant {
        participant_id: String,
        tier: String,
    },
    Rank,
    Next,
    Status,
    Reset,
    History {
        #[serde(default)]
        participant_id: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Award {
        award_id: String,
    },
    AddParticipant {
        name: String,
        #[serde(default = "default_active")]
        active: bool,
    },
    UpdateParticipant {
        participant_id: String,
        #[serde(flatten)]
        patch: ParticipantPatch,
    },
    RemoveParticipant {
        participant_id: String,
    },
    Participants {
        #[serde(default)]
        active_only: bool,
    },
    RosterStats,
    Tiers,
    Stats,
    Quit,
}

fn default_active() -> bool {
    true
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = parse_str_arg(&args, "--db", ":memory:");
    let data_dir = parse_str_arg(&args, "--data-dir", "./data");

    let config = RotationConfig::load(data_dir)?;
    let store = RotationStore::open(db)?;
    store.migrate()?;
    let engine = RotationEngine::build(store, config)?;

    if ipc_mode {
        run_ipc_loop(&engine)?;
    } else {
        print_summary(&engine, db)?;
    }
    Ok(())
}

fn run_ipc_loop(engine: &RotationEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let kind = ErrorKind::Validation.as_str();
                let err_json = json!({ "error": { "kind": kind, "message": e.to_string() } });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(request, IpcRequest::Quit) {
            break;
        }

        let response = match handle_request(engine, request) {
            Ok(value) => json!({ "ok": value }),
            Err(e) => error_response(&e),
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_request(engine: &RotationEngine, request: IpcRequest) -> Result<Value, RotationError> {
    let value = match request {
        IpcRequest::Grant { participant_id, tier } => {
            serde_json::to_value(engine.grant_award_now(&participant_id, &tier)?)?
        }
        IpcRequest::Rank => serde_json::to_value(engine.rank()?)?,
        IpcRequest::Next => serde_json::to_value(engine.next_candidate()?)?,
        IpcRequest::Status => serde_json::to_value(engine.rotation_status()?)?,
        IpcRequest::Reset => json!({ "new_cycle": engine.reset_rotation()? }),
        IpcRequest::History { participant_id: Some(id), .. } => {
            serde_json::to_value(engine.history_for(&id)?)?
        }
        IpcRequest::History { participant_id: None, limit } => {
            serde_json::to_value(engine.recent_awards(limit)?)?
        }
        IpcRequest::Award { award_id } => serde_json::to_value(engine.award(&award_id)?)?,
        IpcRequest::AddParticipant { name, active } => {
            serde_json::to_value(engine.add_participant(&name, active)?)?
        }
        IpcRequest::UpdateParticipant { participant_id, patch } => {
            serde_json::to_value(engine.update_participant(&participant_id, patch)?)?
        }
        IpcRequest::RemoveParticipant { participant_id } => {
            json!({ "anonymized_awards": engine.remove_participant(&participant_id)? })
        }
        IpcRequest::Participants { active_only: false } => {
            serde_json::to_value(engine.participants()?)?
        }
        IpcRequest::Participants { active_only: true } => {
            serde_json::to_value(engine.active_participants()?)?
        }
        IpcRequest::RosterStats => serde_json::to_value(engine.roster_stats()?)?,
        IpcRequest::Tiers => serde_json::to_value(engine.tiers()?)?,
        IpcRequest::Stats => serde_json::to_value(engine.award_stats()?)?,
        IpcRequest::Quit => Value::Null,
    };
    Ok(value)
}

fn error_response(err: &RotationError) -> Value {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        log::error!("request failed: {err}");
    }
    json!({ "error": { "kind": kind.as_str(), "message": err.to_string() } })
}

fn print_summary(engine: &RotationEngine, db: &str) -> Result<()> {
    let status = engine.rotation_status()?;
    let roster = engine.roster_stats()?;
    let stats = engine.award_stats()?;
    let config = engine.config();

    println!("=== ROTATION STATUS ===");
    println!("  db:             {db}");
    println!("  tier policy:    {:?} (fallback {} pts)", config.unknown_tier_policy, config.fallback_points);
    println!("  current cycle:  {}", status.current_cycle);
    println!("  active:         {}", status.total_active);
    println!("  awarded:        {}", status.awarded_count);
    println!("  pending:        {}", status.pending_count);
    println!("  complete:       {}", status.rotation_complete);
    match &status.next_candidate {
        Some(next) => println!("  next up:        {} ({} awards)", next.name, next.total_awards),
        None => println!("  next up:        (no active participants)"),
    }

    println!();
    println!("=== ROSTER ===");
    println!("  participants:   {}", roster.total);
    println!("  active:         {}", roster.active);
    println!("  inactive:       {}", roster.inactive);
    println!("  avg awards:     {:.2}", roster.avg_awards);

    println!();
    println!("=== AWARDS ===");
    println!("  total awards:   {}", stats.total_awards);
    println!("  total points:   {}", stats.total_points);
    println!("  awardees:       {}", stats.distinct_awardees);
    println!("  avg/awardee:    {:.2}", stats.avg_awards_per_awardee);
    for (i, top) in stats.top_awardees.iter().enumerate() {
        println!(
            "  {:>2}. {} | awards: {} | points: {}",
            i + 1,
            top.name,
            top.total_awards,
            top.total_points
        );
    }

    let recent = engine.recent_awards(Some(5))?;
    if !recent.is_empty() {
        println!();
        println!("=== RECENT ===");
        for award in recent {
            println!(
                "  {} | {} | {} ({} pts) | cycle {}",
                award.awarded_at.format("%Y-%m-%d %H:%M"),
                award.subject_name,
                award.tier,
                award.points,
                award.cycle
            );
        }
    }
    Ok(())
}

fn parse_str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
