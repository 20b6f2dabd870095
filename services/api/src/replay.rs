use crate::infra::build_engine;
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;
use walletbot::config::AppConfig;
use walletbot::error::AppError;
use walletbot::telemetry;
use walletbot::transport::{ScriptLine, ScriptReader};

#[derive(Args, Debug)]
pub(crate) struct ReplayArgs {
    /// CSV script with `identity,text` rows
    pub(crate) script: PathBuf,
    /// Also write `identity,text,reply` rows to this CSV file
    #[arg(long)]
    pub(crate) transcript: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TranscriptRow<'a> {
    identity: &'a str,
    text: &'a str,
    reply: &'a str,
}

pub(crate) fn run_replay(args: ReplayArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let engine = build_engine(&config)?;

    let script = File::open(&args.script)?;
    let mut transcript = match &args.transcript {
        Some(path) => Some(csv::Writer::from_path(path)?),
        None => None,
    };

    let mut replayed = 0usize;
    for line in ScriptReader::new(script).lines() {
        let ScriptLine { identity, text } = match line {
            Ok(line) if line.identity.is_empty() => {
                eprintln!("Error reading script line: missing identity");
                continue;
            }
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading script line: {}", e);
                continue;
            }
        };

        let reply = engine.handle(&identity, &text);
        println!("> {identity}: {text}");
        println!("{reply}\n");

        if let Some(writer) = transcript.as_mut() {
            writer.serialize(TranscriptRow {
                identity: &identity,
                text: &text,
                reply: &reply,
            })?;
        }
        replayed += 1;
    }

    if let Some(mut writer) = transcript {
        writer.flush()?;
    }

    info!(replayed, script = %args.script.display(), "conversation script replayed");
    Ok(())
}
