use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{CargoType, WagonType};
use super::reference;

/// Scoring configuration: factor weights, compatibility data, and thresholds.
///
/// All fields can be supplied from a JSON document so operators can retune the rubric without
/// a rebuild. [`MatchingConfig::default`] returns the reference tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingConfig {
    pub weights: FactorWeights,
    pub cargo_wagon_compatibility: CompatibilityMatrix,
    pub regional_proximity: ProximityTable,
    #[serde(default)]
    pub partial_region_match: PartialRegionMatch,
    /// Offers may exceed the seeker's max price by this percentage before scoring drops sharply.
    pub price_tolerance_percentage: f64,
    /// Fraction (0-1) a candidate must reach to be returned by the synchronizer.
    pub min_score_threshold: f64,
    pub min_date_overlap_days: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            cargo_wagon_compatibility: CompatibilityMatrix::reference(),
            regional_proximity: ProximityTable::reference(),
            partial_region_match: PartialRegionMatch::default(),
            price_tolerance_percentage: 15.0,
            min_score_threshold: 0.5,
            min_date_overlap_days: 1,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        self.weights.validate()?;

        if !(self.price_tolerance_percentage.is_finite() && self.price_tolerance_percentage > 0.0)
        {
            return Err(ScoringConfigError::InvalidTolerance(
                self.price_tolerance_percentage,
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score_threshold) {
            return Err(ScoringConfigError::InvalidThreshold(self.min_score_threshold));
        }
        if self.min_date_overlap_days < 0 {
            return Err(ScoringConfigError::InvalidOverlapDays(
                self.min_date_overlap_days,
            ));
        }

        for (cargo, row) in &self.cargo_wagon_compatibility.rows {
            for (wagon, value) in row {
                if !(0.0..=1.0).contains(value) {
                    return Err(ScoringConfigError::CompatibilityOutOfRange {
                        cargo: *cargo,
                        wagon: *wagon,
                        value: *value,
                    });
                }
            }
        }

        for (pair, value) in &self.regional_proximity.pairs {
            if !(0.0..=1.0).contains(value) {
                return Err(ScoringConfigError::ProximityOutOfRange {
                    first: pair.first.clone(),
                    second: pair.second.clone(),
                    value: *value,
                });
            }
        }

        self.partial_region_match.validate()
    }

    /// Minimum external (0-100) score a candidate must reach.
    pub fn min_external_score(&self) -> f64 {
        self.min_score_threshold * 100.0
    }
}

/// Per-factor weights. Expected to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorWeights {
    pub wagon_type: f64,
    pub cargo_type: f64,
    pub date_overlap: f64,
    pub regional_proximity: f64,
    pub price_match: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            wagon_type: 0.25,
            cargo_type: 0.25,
            date_overlap: 0.15,
            regional_proximity: 0.15,
            price_match: 0.20,
        }
    }
}

impl FactorWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    pub fn total(&self) -> f64 {
        self.wagon_type + self.cargo_type + self.date_overlap + self.regional_proximity
            + self.price_match
    }

    fn validate(&self) -> Result<(), ScoringConfigError> {
        let named = [
            ("wagonType", self.wagon_type),
            ("cargoType", self.cargo_type),
            ("dateOverlap", self.date_overlap),
            ("regionalProximity", self.regional_proximity),
            ("priceMatch", self.price_match),
        ];
        for (factor, weight) in named {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ScoringConfigError::WeightOutOfRange { factor, weight });
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ScoringConfigError::WeightsDoNotSumToOne(total));
        }
        Ok(())
    }
}

/// Bonus applied when exactly one end of the route shares a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRegionMatch {
    pub base: f64,
    pub per_matching_side: f64,
    pub cap: f64,
}

impl Default for PartialRegionMatch {
    fn default() -> Self {
        Self {
            base: 0.6,
            per_matching_side: 0.5,
            cap: 0.9,
        }
    }
}

impl PartialRegionMatch {
    fn validate(&self) -> Result<(), ScoringConfigError> {
        let in_range = |value: f64| (0.0..=1.0).contains(&value);
        if in_range(self.base) && in_range(self.per_matching_side) && in_range(self.cap) {
            Ok(())
        } else {
            Err(ScoringConfigError::InvalidPartialRegionMatch)
        }
    }
}

/// Two-level cargo -> wagon -> score lookup. Missing cells are scored with a neutral default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityMatrix {
    rows: BTreeMap<CargoType, BTreeMap<WagonType, f64>>,
}

impl CompatibilityMatrix {
    pub fn reference() -> Self {
        let rows = CargoType::ALL
            .into_iter()
            .map(|cargo| {
                let row = WagonType::ALL
                    .into_iter()
                    .map(|wagon| (wagon, reference::cargo_wagon_compatibility(cargo, wagon)))
                    .collect();
                (cargo, row)
            })
            .collect();
        Self { rows }
    }

    pub fn get(&self, cargo: CargoType, wagon: WagonType) -> Option<f64> {
        self.rows.get(&cargo).and_then(|row| row.get(&wagon)).copied()
    }

    pub fn set(&mut self, cargo: CargoType, wagon: WagonType, value: f64) {
        self.rows.entry(cargo).or_default().insert(wagon, value);
    }

    pub fn remove(&mut self, cargo: CargoType, wagon: WagonType) -> Option<f64> {
        self.rows.get_mut(&cargo).and_then(|row| row.remove(&wagon))
    }
}

/// Undirected pair of region names. Stored with the lexicographically smaller name first so
/// `(a, b)` and `(b, a)` resolve to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPair {
    first: String,
    second: String,
}

impl RegionPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (a, b) = (a.trim(), b.trim());
        if a <= b {
            Self {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            Self {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }
}

/// Serialized form of one proximity table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityEntry {
    pub regions: [String; 2],
    pub score: f64,
}

/// Symmetric region proximity lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ProximityEntry>", into = "Vec<ProximityEntry>")]
pub struct ProximityTable {
    pairs: BTreeMap<RegionPair, f64>,
}

impl ProximityTable {
    pub fn reference() -> Self {
        let mut table = Self::default();
        for (a, b, score) in reference::REGION_PROXIMITY {
            table.insert(a, b, *score);
        }
        table
    }

    pub fn insert(&mut self, a: &str, b: &str, score: f64) {
        self.pairs.insert(RegionPair::new(a, b), score);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.pairs.get(&RegionPair::new(a, b)).copied()
    }
}

impl From<Vec<ProximityEntry>> for ProximityTable {
    fn from(entries: Vec<ProximityEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            let [a, b] = entry.regions;
            table.insert(&a, &b, entry.score);
        }
        table
    }
}

impl From<ProximityTable> for Vec<ProximityEntry> {
    fn from(table: ProximityTable) -> Self {
        table
            .pairs
            .into_iter()
            .map(|(pair, score)| ProximityEntry {
                regions: [pair.first, pair.second],
                score,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringConfigError {
    #[error("factor weights must sum to 1.0 (got {0:.4})")]
    WeightsDoNotSumToOne(f64),
    #[error("weight for {factor} must be within 0..=1 (got {weight})")]
    WeightOutOfRange { factor: &'static str, weight: f64 },
    #[error("price tolerance percentage must be positive (got {0})")]
    InvalidTolerance(f64),
    #[error("minimum score threshold must be within 0..=1 (got {0})")]
    InvalidThreshold(f64),
    #[error("minimum date overlap cannot be negative (got {0} days)")]
    InvalidOverlapDays(i64),
    #[error("compatibility of {cargo} with {wagon} must be within 0..=1 (got {value})")]
    CompatibilityOutOfRange {
        cargo: CargoType,
        wagon: WagonType,
        value: f64,
    },
    #[error("proximity of '{first}' and '{second}' must be within 0..=1 (got {value})")]
    ProximityOutOfRange {
        first: String,
        second: String,
        value: f64,
    },
    #[error("partial region match values must be within 0..=1")]
    InvalidPartialRegionMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        let config = MatchingConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let mut config = MatchingConfig::default();
        config.weights.price_match = 0.3;
        assert!(matches!(
            config.validate(),
            Err(ScoringConfigError::WeightsDoNotSumToOne(_))
        ));
    }

    #[test]
    fn proximity_lookup_ignores_pair_order() {
        let table = ProximityTable::reference();
        assert_eq!(
            table.get("Московская область", "Тверская область"),
            table.get("Тверская область", "Московская область")
        );
        assert_eq!(
            table.get("Кемеровская область", "Новосибирская область"),
            Some(0.95)
        );
    }

    #[test]
    fn reference_matrix_covers_every_pair() {
        let matrix = CompatibilityMatrix::reference();
        for cargo in CargoType::ALL {
            for wagon in WagonType::ALL {
                assert!(matrix.get(cargo, wagon).is_some(), "{cargo}/{wagon} missing");
            }
        }
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = MatchingConfig::default();
        let json = serde_json::to_string(&config).expect("serializes");
        let parsed: MatchingConfig = serde_json::from_str(&json).expect("parses");
        assert_eq!(parsed, config);
    }
}
