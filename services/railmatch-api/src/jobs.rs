use crate::cli::CatalogArgs;
use crate::infra::{build_service, load_catalog};
use clap::Args;
use railmatch::config::AppConfig;
use railmatch::error::AppError;
use railmatch::matching::{
    BatchCancellation, MatchResponse, RecomputeOptions, RecomputeSummary, RequestId,
};
use railmatch::telemetry;

#[derive(Args, Debug)]
pub(crate) struct RecomputeArgs {
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Only rescore these requests (repeatable); all requests when omitted
    #[arg(long = "request-id")]
    pub(crate) request_ids: Vec<u64>,
    /// Pairs scored in parallel; falls back to MATCHING_BATCH_CONCURRENCY
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
    /// Log each scored pair
    #[arg(long)]
    pub(crate) verbose: bool,
    /// Print the summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Request to rank offers for
    #[arg(long)]
    pub(crate) request_id: u64,
}

pub(crate) async fn run_recompute(args: RecomputeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if args.verbose {
        config.telemetry.log_level = "debug".to_string();
    }
    telemetry::init(&config.telemetry)?;

    let marketplace = load_catalog(&args.catalog)?;
    let service = build_service(&config, marketplace)?;

    let options = RecomputeOptions {
        request_ids: if args.request_ids.is_empty() {
            None
        } else {
            Some(args.request_ids.iter().copied().map(RequestId).collect())
        },
        concurrency: args
            .concurrency
            .unwrap_or(config.matching.batch_concurrency),
    };

    let cancellation = BatchCancellation::new();
    let interrupt = cancellation.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight pairs");
            interrupt.cancel();
        }
    });

    let summary = service.recompute(&options, &cancellation).await;
    watcher.abort();
    let summary = summary?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        render_summary(&summary);
    }
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let marketplace = load_catalog(&args.catalog)?;
    let service = build_service(&config, marketplace)?;

    let response = service.match_request(RequestId(args.request_id), None)?;
    render_ranking(&response);
    Ok(())
}

fn render_summary(summary: &RecomputeSummary) {
    println!("Match recomputation");
    println!("- requests processed: {}", summary.requests_processed);
    println!(
        "- pairs scored: {} | written: {} | at or above threshold: {}",
        summary.pairs_scored, summary.matches_written, summary.above_threshold
    );
    if summary.cancelled {
        println!("- stopped early on interrupt");
    }
    if !summary.failures.is_empty() {
        println!("Failures:");
        for failure in &summary.failures {
            let offer = failure
                .offer_id
                .map_or_else(|| "?".to_string(), |id| id.to_string());
            let request = failure
                .request_id
                .map_or_else(|| "?".to_string(), |id| id.to_string());
            println!("  - request {request} / offer {offer}: {}", failure.error);
        }
    }
}

pub(crate) fn render_ranking(response: &MatchResponse) {
    let request = &response.request_details;
    println!(
        "Request {}: {} {} -> {} ({} to {})",
        request.id,
        request.cargo_type,
        request.departure_station,
        request.arrival_station,
        request.loading_date,
        request.required_by_date
    );
    if response.matches.is_empty() {
        println!("  no offers clear the score threshold");
        return;
    }
    for (rank, candidate) in response.matches.iter().enumerate() {
        println!(
            "{}. offer {} (match {}): score {} | {} x{} at {:.0} per wagon",
            rank + 1,
            candidate.offer_id,
            candidate.match_id,
            candidate.score.score,
            candidate.offer.wagon_type,
            candidate.offer.wagon_count,
            candidate.offer.price_per_wagon
        );
        for reason in &candidate.score.reasons {
            println!(
                "    - {}: {:.2} x {:.2} | {}",
                reason.label, reason.score, reason.weight, reason.explanation
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_json_uses_camel_case_counts() {
        let summary = RecomputeSummary {
            requests_processed: 2,
            pairs_scored: 6,
            matches_written: 6,
            above_threshold: 3,
            failures: Vec::new(),
            cancelled: false,
        };

        let rendered = serde_json::to_string_pretty(&summary).expect("serializes");
        assert!(rendered.contains("\"requestsProcessed\": 2"));
        assert!(rendered.contains("\"aboveThreshold\": 3"));
    }
}
