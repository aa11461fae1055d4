//! The five independent factor scorers.
//!
//! Each scorer is a pure function of its inputs and returns a score in `0.0..=1.0` together with
//! the explanation shown to end users, so explanations must stay deterministic.

use chrono::NaiveDate;

use super::super::domain::{CargoType, WagonType};
use super::config::{CompatibilityMatrix, PartialRegionMatch, ProximityTable};

pub const NEUTRAL_WAGON_SCORE: f64 = 0.7;
pub const SUBSTITUTE_WAGON_SCORE: f64 = 0.6;
pub const UNKNOWN_COMPATIBILITY_SCORE: f64 = 0.5;
pub const MINIMAL_OVERLAP_SCORE: f64 = 0.3;
pub const UNKNOWN_PROXIMITY_SCORE: f64 = 0.4;
pub const NEUTRAL_PRICE_SCORE: f64 = 0.7;
pub const PRICE_FLOOR_SCORE: f64 = 0.2;

/// Score and explanation produced by a single factor.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorOutcome {
    pub score: f64,
    pub explanation: String,
}

impl FactorOutcome {
    fn new(score: f64, explanation: impl Into<String>) -> Self {
        Self {
            score,
            explanation: explanation.into(),
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    fn intersection(&self, other: &DateWindow) -> Option<DateWindow> {
        if self.start > other.end || self.end < other.start {
            return None;
        }
        Some(DateWindow {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

/// Departure and arrival regions of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRegions<'a> {
    pub departure: &'a str,
    pub arrival: &'a str,
}

impl RouteRegions<'_> {
    /// Region names are compared without surrounding whitespace, as the proximity table keys are.
    fn trimmed(self) -> Self {
        Self {
            departure: self.departure.trim(),
            arrival: self.arrival.trim(),
        }
    }
}

pub fn wagon_type(offered: WagonType, requested: Option<WagonType>) -> FactorOutcome {
    match requested {
        None => FactorOutcome::new(
            NEUTRAL_WAGON_SCORE,
            "request does not specify a wagon type",
        ),
        Some(requested) if requested == offered => {
            FactorOutcome::new(1.0, format!("wagon type matches: {offered}"))
        }
        Some(requested) => FactorOutcome::new(
            SUBSTITUTE_WAGON_SCORE,
            format!("wagon type differs (offer: {offered}, request: {requested})"),
        ),
    }
}

/// Scores the offer's wagon against the request's cargo; the cargo dictates the wagon needed.
pub fn cargo_compatibility(
    cargo: CargoType,
    wagon: WagonType,
    matrix: &CompatibilityMatrix,
) -> FactorOutcome {
    let Some(compatibility) = matrix.get(cargo, wagon) else {
        return FactorOutcome::new(
            UNKNOWN_COMPATIBILITY_SCORE,
            format!("unknown compatibility of {cargo} cargo with {wagon} wagons"),
        );
    };

    let grade = if compatibility >= 1.0 {
        "ideal"
    } else if compatibility >= 0.8 {
        "good"
    } else if compatibility >= 0.5 {
        "acceptable"
    } else {
        "weak"
    };

    FactorOutcome::new(
        compatibility,
        format!("{grade} compatibility of {cargo} cargo with {wagon} wagons"),
    )
}

pub fn date_overlap(
    availability: DateWindow,
    requested: DateWindow,
    min_overlap_days: i64,
) -> FactorOutcome {
    let Some(overlap) = availability.intersection(&requested) else {
        return FactorOutcome::new(
            0.0,
            format!(
                "availability {} to {} misses the requested window {} to {}",
                availability.start, availability.end, requested.start, requested.end
            ),
        );
    };

    let overlap_days = overlap.days();
    if overlap_days < min_overlap_days {
        return FactorOutcome::new(
            MINIMAL_OVERLAP_SCORE,
            format!("dates overlap by only {overlap_days} day(s)"),
        );
    }

    let request_days = requested.days();
    let coverage = if request_days > 0 {
        (overlap_days as f64 / request_days as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let (score, grade) = if coverage >= 0.9 {
        (1.0, "dates align")
    } else if coverage >= 0.7 {
        (0.9, "dates mostly align")
    } else if coverage >= 0.5 {
        (0.7, "dates partially align")
    } else {
        (0.4, "dates barely align")
    };

    FactorOutcome::new(
        score,
        format!(
            "{grade}: {overlap_days} of {request_days} requested day(s) covered ({:.0}%)",
            coverage * 100.0
        ),
    )
}

pub fn regional_proximity(
    offer: RouteRegions<'_>,
    request: RouteRegions<'_>,
    table: &ProximityTable,
    partial: &PartialRegionMatch,
) -> FactorOutcome {
    let (offer, request) = (offer.trimmed(), request.trimmed());
    let departure_matches = offer.departure == request.departure;
    let arrival_matches = offer.arrival == request.arrival;

    if departure_matches && arrival_matches {
        return FactorOutcome::new(1.0, "routes match on both ends");
    }

    if departure_matches || arrival_matches {
        let score = (partial.base + partial.per_matching_side).min(partial.cap);
        let side = if departure_matches {
            format!("departure region {} matches", offer.departure)
        } else {
            format!("arrival region {} matches", offer.arrival)
        };
        return FactorOutcome::new(score, side);
    }

    match table.get(offer.departure, request.departure) {
        Some(proximity) => FactorOutcome::new(
            proximity,
            format!(
                "departure regions {} and {} are within reach",
                offer.departure, request.departure
            ),
        ),
        None => FactorOutcome::new(
            UNKNOWN_PROXIMITY_SCORE,
            format!(
                "departure regions {} and {} are distant but the route is feasible",
                offer.departure, request.departure
            ),
        ),
    }
}

pub fn price_match(
    offer_price: f64,
    max_price: Option<f64>,
    tolerance_percentage: f64,
) -> FactorOutcome {
    let Some(max_price) = max_price else {
        return FactorOutcome::new(
            NEUTRAL_PRICE_SCORE,
            "request does not specify a maximum price",
        );
    };

    if offer_price <= max_price {
        return FactorOutcome::new(
            1.0,
            format!("offer price within budget ({offer_price} <= {max_price})"),
        );
    }

    let exceeded_percent = (offer_price - max_price) / max_price * 100.0;
    if !exceeded_percent.is_finite() {
        return FactorOutcome::new(
            PRICE_FLOOR_SCORE,
            format!("offer price {offer_price} exceeds a zero budget"),
        );
    }

    if exceeded_percent <= tolerance_percentage {
        let score = (1.0 - (exceeded_percent / tolerance_percentage) * 0.5).max(0.5);
        return FactorOutcome::new(
            score,
            format!(
                "price exceeds budget by {exceeded_percent:.1}%, within {tolerance_percentage}% tolerance"
            ),
        );
    }

    let score = (1.0 - (exceeded_percent / 100.0) * 0.8).max(PRICE_FLOOR_SCORE);
    FactorOutcome::new(
        score,
        format!("price exceeds budget by {exceeded_percent:.1}%"),
    )
}
