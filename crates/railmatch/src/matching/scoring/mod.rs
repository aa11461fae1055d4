mod config;
pub mod factors;
mod reference;

pub use config::{
    CompatibilityMatrix, FactorWeights, MatchingConfig, PartialRegionMatch, ProximityEntry,
    ProximityTable, RegionPair, ScoringConfigError,
};

use serde::{Deserialize, Serialize};

use super::domain::{Offer, TransportRequest};
use factors::{DateWindow, FactorOutcome, RouteRegions};

/// Stateless scorer applying a [`MatchingConfig`] to (offer, request) pairs.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: MatchingConfig,
}

impl ScoringEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Score a pair. Total over any structurally valid input.
    pub fn score(&self, offer: &Offer, request: &TransportRequest) -> MatchScore {
        let config = &self.config;

        let wagon = factors::wagon_type(offer.wagon_type, request.wagon_type);
        let cargo = factors::cargo_compatibility(
            request.cargo_type,
            offer.wagon_type,
            &config.cargo_wagon_compatibility,
        );
        let dates = factors::date_overlap(
            DateWindow::new(offer.available_from, offer.available_until),
            DateWindow::new(request.loading_date, request.required_by_date),
            config.min_date_overlap_days,
        );
        let region = factors::regional_proximity(
            RouteRegions {
                departure: &offer.departure_region,
                arrival: &offer.arrival_region,
            },
            RouteRegions {
                departure: &request.departure_region,
                arrival: &request.arrival_region,
            },
            &config.regional_proximity,
            &config.partial_region_match,
        );
        let price = factors::price_match(
            offer.price_per_wagon,
            request.max_price_per_wagon,
            config.price_tolerance_percentage,
        );

        let metadata = FactorScores {
            wagon_type_match: wagon.score,
            cargo_type_match: cargo.score,
            date_overlap: dates.score,
            regional_proximity: region.score,
            price_match: price.score,
        };

        let reasons: Vec<ScoreReason> = [wagon, cargo, dates, region, price]
            .into_iter()
            .zip(ScoringFactor::ORDER)
            .map(|(outcome, factor)| ScoreReason::new(factor, outcome, &config.weights))
            .collect();

        let weighted: f64 = reasons
            .iter()
            .map(|reason| reason.score * reason.weight)
            .sum();

        MatchScore {
            score: to_external_scale(weighted),
            reasons,
            metadata,
        }
    }
}

fn to_external_scale(weighted: f64) -> u8 {
    (weighted * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Scoring dimensions, in the order they are always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringFactor {
    WagonType,
    CargoType,
    DateOverlap,
    RegionalProximity,
    PriceMatch,
}

impl ScoringFactor {
    pub const ORDER: [ScoringFactor; 5] = [
        ScoringFactor::WagonType,
        ScoringFactor::CargoType,
        ScoringFactor::DateOverlap,
        ScoringFactor::RegionalProximity,
        ScoringFactor::PriceMatch,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ScoringFactor::WagonType => "Wagon type",
            ScoringFactor::CargoType => "Cargo and wagon compatibility",
            ScoringFactor::DateOverlap => "Date overlap",
            ScoringFactor::RegionalProximity => "Route proximity",
            ScoringFactor::PriceMatch => "Price match",
        }
    }

    pub fn weight(self, weights: &FactorWeights) -> f64 {
        match self {
            ScoringFactor::WagonType => weights.wagon_type,
            ScoringFactor::CargoType => weights.cargo_type,
            ScoringFactor::DateOverlap => weights.date_overlap,
            ScoringFactor::RegionalProximity => weights.regional_proximity,
            ScoringFactor::PriceMatch => weights.price_match,
        }
    }
}

/// One explained contribution to a match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReason {
    pub factor: ScoringFactor,
    pub label: String,
    pub score: f64,
    pub weight: f64,
    pub explanation: String,
}

impl ScoreReason {
    fn new(factor: ScoringFactor, outcome: FactorOutcome, weights: &FactorWeights) -> Self {
        Self {
            factor,
            label: factor.label().to_string(),
            score: outcome.score,
            weight: factor.weight(weights),
            explanation: outcome.explanation,
        }
    }

    /// Contribution of this factor on the 0-1 scale.
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

/// Raw factor scores kept alongside a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    pub wagon_type_match: f64,
    pub cargo_type_match: f64,
    pub date_overlap: f64,
    pub regional_proximity: f64,
    pub price_match: f64,
}

/// Engine output: external 0-100 score plus its explained breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u8,
    pub reasons: Vec<ScoreReason>,
    pub metadata: FactorScores,
}

impl MatchScore {
    /// The score on the internal 0-1 scale used for persistence.
    pub fn fraction(&self) -> f64 {
        f64::from(self.score) / 100.0
    }
}
