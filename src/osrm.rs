//! OSRM HTTP adapter for network distance tables.
//!
//! One blocking `table` request per matrix, single attempt, client-level
//! timeout. Every failure mode (transport, status, malformed table) is
//! reported through [`DistanceServiceError`] so the caller can branch to the
//! geodesic fallback explicitly.

use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug)]
pub enum DistanceServiceError {
    /// Connection, timeout, HTTP status, or body decoding failure.
    Transport(reqwest::Error),
    /// The service answered but did not flag success.
    ServiceStatus(String),
    /// Success flag present but the distance table is missing or mis-shaped.
    MalformedTable,
}

impl fmt::Display for DistanceServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceServiceError::Transport(err) => write!(f, "transport failure: {err}"),
            DistanceServiceError::ServiceStatus(code) => {
                write!(f, "service answered with code {code}")
            }
            DistanceServiceError::MalformedTable => write!(f, "malformed distance table"),
        }
    }
}

impl std::error::Error for DistanceServiceError {}

impl From<reqwest::Error> for DistanceServiceError {
    fn from(err: reqwest::Error) -> Self {
        DistanceServiceError::Transport(err)
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, DistanceServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Requests the full pairwise distance table for (lat, lng) points,
    /// in the given order, truncated to whole meters.
    pub fn distance_table(
        &self,
        locations: &[(f64, f64)],
    ) -> Result<Vec<Vec<i64>>, DistanceServiceError> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/table/v1/{}/{}?annotations=distance",
            self.config.base_url,
            self.config.profile,
            coordinate_path(locations)
        );

        let body = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json::<OsrmTableResponse>()?;

        if body.code.as_deref() != Some("Ok") {
            return Err(DistanceServiceError::ServiceStatus(
                body.code.unwrap_or_else(|| "missing".to_string()),
            ));
        }

        let table = body.distances.ok_or(DistanceServiceError::MalformedTable)?;
        if table.len() != locations.len()
            || table.iter().any(|row| row.len() != locations.len())
        {
            return Err(DistanceServiceError::MalformedTable);
        }

        table
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|meters| {
                        // OSRM reports unreachable pairs as null.
                        meters
                            .map(|m| m.max(0.0) as i64)
                            .ok_or(DistanceServiceError::MalformedTable)
                    })
                    .collect()
            })
            .collect()
    }
}

/// OSRM expects semicolon-separated longitude,latitude pairs.
fn coordinate_path(locations: &[(f64, f64)]) -> String {
    locations
        .iter()
        .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: Option<String>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}
