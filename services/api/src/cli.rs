use crate::chat::{run_chat, ChatArgs};
use crate::replay::{run_replay, ReplayArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use walletbot::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "walletbot",
    about = "Run the chat wallet and community lending service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Feed a CSV conversation script through the engine and print every reply
    Replay(ReplayArgs),
    /// Talk to the engine interactively from the terminal
    Chat(ChatArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Replay(args) => run_replay(args),
        Command::Chat(args) => run_chat(args),
    }
}
