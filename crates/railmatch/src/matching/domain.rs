use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an operator's wagon offer.
    OfferId
);
numeric_id!(
    /// Identifier of a seeker's transport request.
    RequestId
);
numeric_id!(
    /// Identifier of a scored (offer, request) pair.
    MatchId
);
numeric_id!(
    /// Identifier of a company owning offers or requests.
    CompanyId
);
numeric_id!(
    /// Identifier of a deal status history entry. Monotonic per store.
    HistoryId
);

/// Rail car types an operator can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WagonType {
    Tank,
    Hopper,
    Flatcar,
    Boxcar,
    Gondola,
    Refrigerator,
    Platform,
}

impl WagonType {
    pub const ALL: [WagonType; 7] = [
        WagonType::Tank,
        WagonType::Hopper,
        WagonType::Flatcar,
        WagonType::Boxcar,
        WagonType::Gondola,
        WagonType::Refrigerator,
        WagonType::Platform,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            WagonType::Tank => "TANK",
            WagonType::Hopper => "HOPPER",
            WagonType::Flatcar => "FLATCAR",
            WagonType::Boxcar => "BOXCAR",
            WagonType::Gondola => "GONDOLA",
            WagonType::Refrigerator => "REFRIGERATOR",
            WagonType::Platform => "PLATFORM",
        }
    }
}

impl fmt::Display for WagonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WagonType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        WagonType::ALL
            .into_iter()
            .find(|wagon| wagon.label() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "wagon type",
                value: value.to_string(),
            })
    }
}

/// Cargo categories a seeker can ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CargoType {
    Coal,
    Oil,
    Grain,
    Metal,
    Chemical,
    Timber,
    Container,
    Bulk,
    Other,
}

impl CargoType {
    pub const ALL: [CargoType; 9] = [
        CargoType::Coal,
        CargoType::Oil,
        CargoType::Grain,
        CargoType::Metal,
        CargoType::Chemical,
        CargoType::Timber,
        CargoType::Container,
        CargoType::Bulk,
        CargoType::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CargoType::Coal => "COAL",
            CargoType::Oil => "OIL",
            CargoType::Grain => "GRAIN",
            CargoType::Metal => "METAL",
            CargoType::Chemical => "CHEMICAL",
            CargoType::Timber => "TIMBER",
            CargoType::Container => "CONTAINER",
            CargoType::Bulk => "BULK",
            CargoType::Other => "OTHER",
        }
    }
}

impl fmt::Display for CargoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CargoType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        CargoType::ALL
            .into_iter()
            .find(|cargo| cargo.label() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "cargo type",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Wagon supply advertised by an operator for a route, window, and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: OfferId,
    pub company_id: CompanyId,
    pub wagon_type: WagonType,
    pub cargo_type: CargoType,
    pub wagon_count: u32,
    pub departure_station: String,
    pub departure_region: String,
    pub arrival_station: String,
    pub arrival_region: String,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub price_per_wagon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

/// A seeker's need for wagons to move cargo between two stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRequest {
    pub id: RequestId,
    pub company_id: CompanyId,
    pub cargo_type: CargoType,
    #[serde(default)]
    pub wagon_type: Option<WagonType>,
    pub cargo_weight: f64,
    pub departure_station: String,
    pub departure_region: String,
    pub arrival_station: String,
    pub arrival_region: String,
    pub loading_date: NaiveDate,
    pub required_by_date: NaiveDate,
    #[serde(default)]
    pub max_price_per_wagon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Negotiation state of a match or a request-only thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    Pending,
    Negotiating,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl DealStatus {
    pub const ALL: [DealStatus; 6] = [
        DealStatus::Pending,
        DealStatus::Negotiating,
        DealStatus::Accepted,
        DealStatus::Rejected,
        DealStatus::Completed,
        DealStatus::Cancelled,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DealStatus::Pending => "PENDING",
            DealStatus::Negotiating => "NEGOTIATING",
            DealStatus::Accepted => "ACCEPTED",
            DealStatus::Rejected => "REJECTED",
            DealStatus::Completed => "COMPLETED",
            DealStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DealStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        DealStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "deal status",
                value: value.to_string(),
            })
    }
}

/// The entity whose deal status is tracked: a scored match or a bare request thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealSubject {
    #[serde(rename = "matchId")]
    Match(MatchId),
    #[serde(rename = "requestId")]
    Request(RequestId),
}

impl fmt::Display for DealSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealSubject::Match(id) => write!(f, "match #{id}"),
            DealSubject::Request(id) => write!(f, "request #{id}"),
        }
    }
}

/// Immutable audit entry recorded for every accepted status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStatusEntry {
    pub id: HistoryId,
    #[serde(flatten)]
    pub subject: DealSubject,
    pub status: DealStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// History entry before the store assigns its identifier and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDealStatusEntry {
    pub subject: DealSubject,
    pub status: DealStatus,
    pub comment: Option<String>,
}
