use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match railmatch_api::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("railmatch-api: {err}");
            ExitCode::FAILURE
        }
    }
}
