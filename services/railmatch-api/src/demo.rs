use crate::infra::{LogNotifier, Marketplace};
use crate::jobs::render_ranking;
use chrono::NaiveDate;
use clap::Args;
use railmatch::error::AppError;
use railmatch::matching::{
    CargoType, CompanyId, DealStatus, DealSubject, InMemoryMarketplace, MatchingConfig,
    MatchingService, MatchingServiceError, Offer, OfferId, RequestId, TransitionCommand,
    TransportRequest, WagonType,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after printing the ranked candidates.
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Rail freight matching demo");
    let service = demo_service();

    let response = service.match_request(RequestId(100), Some(CompanyId(20)))?;
    render_ranking(&response);

    if args.skip_lifecycle {
        return Ok(());
    }
    let Some(top) = response.matches.first() else {
        println!("No candidate to negotiate.");
        return Ok(());
    };
    let subject = DealSubject::Match(top.match_id);

    println!("\nDeal lifecycle for match {}", top.match_id);
    for (status, comment) in [
        (DealStatus::Negotiating, Some("Seeker asked for a 2% discount")),
        (DealStatus::Accepted, Some("Operator agreed to 51000 per wagon")),
        (DealStatus::Completed, None),
    ] {
        let entry = service.transition(TransitionCommand {
            match_id: Some(top.match_id),
            request_id: None,
            status,
            comment: comment.map(str::to_string),
        })?;
        println!("- #{} -> {}", entry.id, entry.status);
    }

    match service.transition(TransitionCommand {
        match_id: Some(top.match_id),
        request_id: None,
        status: DealStatus::Cancelled,
        comment: None,
    }) {
        Ok(entry) => println!("- unexpectedly cancelled as #{}", entry.id),
        Err(MatchingServiceError::Lifecycle(err)) => println!("- rejected: {}", err),
        Err(err) => return Err(err.into()),
    }

    let view = service.deal_history(subject)?;
    println!("\nHistory (current: {})", view.current_status);
    for entry in &view.history {
        println!(
            "  {} | {} | {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.status,
            entry.comment.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn demo_service() -> Marketplace {
    let marketplace = InMemoryMarketplace::with_catalog(demo_offers(), vec![demo_request()]);
    MatchingService::new(
        Arc::new(marketplace),
        Arc::new(LogNotifier),
        MatchingConfig::default(),
    )
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap_or_default()
}

fn demo_request() -> TransportRequest {
    TransportRequest {
        id: RequestId(100),
        company_id: CompanyId(20),
        cargo_type: CargoType::Metal,
        wagon_type: Some(WagonType::Platform),
        cargo_weight: 640.0,
        departure_station: "Екатеринбург-Сортировочный".to_string(),
        departure_region: "Свердловская область".to_string(),
        arrival_station: "Москва-Товарная".to_string(),
        arrival_region: "Московская область".to_string(),
        loading_date: day(12, 1),
        required_by_date: day(12, 15),
        max_price_per_wagon: Some(55_000.0),
        description: Some("Металлопрокат в пакетах".to_string()),
    }
}

fn demo_offers() -> Vec<Offer> {
    let base = Offer {
        id: OfferId(1),
        company_id: CompanyId(10),
        wagon_type: WagonType::Platform,
        cargo_type: CargoType::Metal,
        wagon_count: 12,
        departure_station: "Екатеринбург-Сортировочный".to_string(),
        departure_region: "Свердловская область".to_string(),
        arrival_station: "Москва-Товарная".to_string(),
        arrival_region: "Московская область".to_string(),
        available_from: day(11, 25),
        available_until: day(12, 25),
        price_per_wagon: 52_000.0,
        description: None,
        is_archived: false,
    };
    vec![
        base.clone(),
        Offer {
            id: OfferId(2),
            company_id: CompanyId(11),
            wagon_type: WagonType::Flatcar,
            departure_station: "Пермь".to_string(),
            departure_region: "Пермский край".to_string(),
            available_from: day(11, 28),
            available_until: day(12, 20),
            price_per_wagon: 57_000.0,
            ..base.clone()
        },
        Offer {
            id: OfferId(3),
            company_id: CompanyId(12),
            wagon_type: WagonType::Tank,
            cargo_type: CargoType::Oil,
            departure_station: "Самара".to_string(),
            departure_region: "Самарская область".to_string(),
            arrival_station: "Санкт-Петербург".to_string(),
            arrival_region: "Ленинградская область".to_string(),
            price_per_wagon: 90_000.0,
            ..base
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_request_ranks_reference_offer_first() {
        let service = demo_service();
        let response = service
            .match_request(RequestId(100), Some(CompanyId(20)))
            .expect("request exists");

        assert_eq!(response.matches[0].offer_id, OfferId(1));
        assert!(response.matches[0].score.score >= 95);
        assert!(response.matches.iter().all(|m| m.offer_id != OfferId(3)));
    }

    #[test]
    fn demo_walk_completes() {
        run_demo(DemoArgs::default()).expect("demo runs");
    }
}
