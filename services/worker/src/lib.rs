mod cli;
mod infra;
mod process;
mod routes;
mod server;

use nbn_ordering::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
