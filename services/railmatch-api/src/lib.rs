//! `railmatch-api`: HTTP service and batch jobs over the in-memory rail marketplace.

mod cli;
mod demo;
mod infra;
mod jobs;
mod routes;
mod server;

use railmatch::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
