use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::domain::{
    CargoType, CompanyId, Offer, OfferId, RequestId, TransportRequest, UnknownVariant, WagonType,
};

const MAX_CARGO_WEIGHT_TONNES: f64 = 10_000.0;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidRow { line, reason } => {
                write!(f, "invalid catalog row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads offers and requests from CSV exports with a camelCase header row.
pub struct CatalogImporter;

impl CatalogImporter {
    pub fn offers_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Offer>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::offers_from_reader(file)
    }

    pub fn offers_from_reader<R: Read>(reader: R) -> Result<Vec<Offer>, CatalogImportError> {
        read_rows(reader, OfferRow::into_offer)
    }

    pub fn requests_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<TransportRequest>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::requests_from_reader(file)
    }

    pub fn requests_from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<TransportRequest>, CatalogImportError> {
        read_rows(reader, RequestRow::into_request)
    }
}

fn read_rows<R, Row, T, F>(reader: R, convert: F) -> Result<Vec<T>, CatalogImportError>
where
    R: Read,
    Row: DeserializeOwned,
    F: Fn(Row) -> Result<T, String>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut items = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: Row = record.deserialize(Some(&headers))?;
        let item = convert(row).map_err(|reason| CatalogImportError::InvalidRow { line, reason })?;
        items.push(item);
    }

    Ok(items)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferRow {
    id: u64,
    company_id: u64,
    wagon_type: String,
    cargo_type: String,
    wagon_count: u32,
    departure_station: String,
    departure_region: String,
    arrival_station: String,
    arrival_region: String,
    available_from: NaiveDate,
    available_until: NaiveDate,
    price_per_wagon: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_archived: Option<String>,
}

impl OfferRow {
    fn into_offer(self) -> Result<Offer, String> {
        let wagon_type: WagonType = self.wagon_type.parse().map_err(describe)?;
        let cargo_type: CargoType = self.cargo_type.parse().map_err(describe)?;

        if self.available_from > self.available_until {
            return Err(format!(
                "availableFrom {} is after availableUntil {}",
                self.available_from, self.available_until
            ));
        }
        if self.wagon_count == 0 {
            return Err("wagonCount must be at least 1".to_string());
        }
        if !self.price_per_wagon.is_finite() || self.price_per_wagon < 0.0 {
            return Err("pricePerWagon must be a non-negative number".to_string());
        }
        require_text("departureStation", &self.departure_station)?;
        require_text("departureRegion", &self.departure_region)?;
        require_text("arrivalStation", &self.arrival_station)?;
        require_text("arrivalRegion", &self.arrival_region)?;

        Ok(Offer {
            id: OfferId(self.id),
            company_id: CompanyId(self.company_id),
            wagon_type,
            cargo_type,
            wagon_count: self.wagon_count,
            departure_station: self.departure_station,
            departure_region: self.departure_region,
            arrival_station: self.arrival_station,
            arrival_region: self.arrival_region,
            available_from: self.available_from,
            available_until: self.available_until,
            price_per_wagon: self.price_per_wagon,
            description: self.description,
            is_archived: parse_flag(self.is_archived.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestRow {
    id: u64,
    company_id: u64,
    cargo_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    wagon_type: Option<String>,
    cargo_weight: f64,
    departure_station: String,
    departure_region: String,
    arrival_station: String,
    arrival_region: String,
    loading_date: NaiveDate,
    required_by_date: NaiveDate,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_price_per_wagon: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
}

impl RequestRow {
    fn into_request(self) -> Result<TransportRequest, String> {
        let cargo_type: CargoType = self.cargo_type.parse().map_err(describe)?;
        let wagon_type = self
            .wagon_type
            .as_deref()
            .map(str::parse::<WagonType>)
            .transpose()
            .map_err(describe)?;

        if self.required_by_date <= self.loading_date {
            return Err(format!(
                "requiredByDate {} must be after loadingDate {}",
                self.required_by_date, self.loading_date
            ));
        }
        if !(self.cargo_weight > 0.0 && self.cargo_weight <= MAX_CARGO_WEIGHT_TONNES) {
            return Err(format!(
                "cargoWeight must be in (0, {MAX_CARGO_WEIGHT_TONNES}] tonnes"
            ));
        }
        let max_price_per_wagon = self
            .max_price_per_wagon
            .as_deref()
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|price| price.is_finite() && *price >= 0.0)
                    .ok_or_else(|| format!("maxPricePerWagon '{raw}' is not a non-negative number"))
            })
            .transpose()?;
        require_text("departureStation", &self.departure_station)?;
        require_text("departureRegion", &self.departure_region)?;
        require_text("arrivalStation", &self.arrival_station)?;
        require_text("arrivalRegion", &self.arrival_region)?;

        Ok(TransportRequest {
            id: RequestId(self.id),
            company_id: CompanyId(self.company_id),
            cargo_type,
            wagon_type,
            cargo_weight: self.cargo_weight,
            departure_station: self.departure_station,
            departure_region: self.departure_region,
            arrival_station: self.arrival_station,
            arrival_region: self.arrival_region,
            loading_date: self.loading_date,
            required_by_date: self.required_by_date,
            max_price_per_wagon,
            description: self.description,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn describe(error: UnknownVariant) -> String {
    error.to_string()
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool, String> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(format!("isArchived '{other}' is not a boolean")),
    }
}
