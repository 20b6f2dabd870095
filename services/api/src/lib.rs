mod chat;
mod cli;
mod infra;
mod replay;
mod routes;
mod server;

use walletbot::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
