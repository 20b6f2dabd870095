use crate::infra::build_engine;
use clap::Args;
use std::io::{self, BufRead};
use walletbot::config::AppConfig;
use walletbot::error::AppError;
use walletbot::telemetry;

#[derive(Args, Debug)]
pub(crate) struct ChatArgs {
    /// Sender identity attached to every message
    #[arg(long, default_value = "whatsapp:+263770000000")]
    pub(crate) identity: String,
}

pub(crate) fn run_chat(args: ChatArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let engine = build_engine(&config)?;

    println!("Chatting as {} (Ctrl-D to quit)", args.identity);
    for line in io::stdin().lock().lines() {
        let line = line?;
        let reply = engine.handle(&args.identity, &line);
        println!("{reply}\n");
    }
    Ok(())
}
