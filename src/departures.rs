//! # ODPT Departure Fetching
//!
//! This module fetches station timetables from the Tokyo ODPT (Open Data for
//! Public Transportation) API and turns them into [`Departure`] lists.
//!
//! ## Data Source
//!
//! ### Station Timetable
//! - **Endpoint**: `odpt:StationTimetable` filtered by station and rail direction
//! - **Format**: JSON array; the first element carrying
//!   `odpt:stationTimetableObject` holds the day's departures
//! - **Times**: `HH:MM` local time of day
//!
//! ### Realtime Delays
//! - **Endpoint**: `odpt:Train` filtered by railway
//! - **Join key**: `odpt:trainNumber`
//! - **Delay**: `odpt:delay` in seconds, shown as whole minutes
//!
//! Realtime data is best effort: if that request fails the timetable is used
//! as is.
//!
//! ## Error Handling
//!
//! - **Network failures and timeouts**: [`FetchError::Http`]
//! - **Non-2xx responses** (bad key, bad station): [`FetchError::Status`]
//! - **Unexpected JSON or times**: [`FetchError::Parse`]
//!
//! A fetch never clears the board on its own; the refresh loop keeps showing
//! the last good data when a fetch fails.

use crate::{Departure, TrainType};
use chrono::{NaiveTime, Timelike};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while fetching departures.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("API returned status {0}")]
    Status(reqwest::StatusCode),

    /// Response body did not have the expected shape
    #[error("parse failed: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// The station whose departures are shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Station {
    /// `Operator.Line.Station`, e.g. `Tokyu.Oimachi.Jiyugaoka`
    pub id: String,
    /// `Outbound` or `Inbound`
    pub direction: String,
}

impl Station {
    /// Railway id (`Operator.Line`) the station belongs to.
    pub fn railway(&self) -> &str {
        self.id.rsplit_once('.').map(|(line, _)| line).unwrap_or(&self.id)
    }
}

/// Anything that can list departures for a station.
///
/// Implementations own their credentials. The returned list is in provider
/// order; use [`upcoming`] to order it for display.
pub trait DepartureSource: Send + Sync + 'static {
    fn fetch(
        &self,
        station: &Station,
    ) -> impl Future<Output = Result<Vec<Departure>, FetchError>> + Send;
}

/// Order `departures` by how soon they leave after `now` and keep `limit`.
///
/// Times are compared on a 24-hour wheel starting at `now` (truncated to the
/// minute), so a 00:10 train comes after a 23:50 one late at night. A train
/// that left earlier in the day sorts as tomorrow's. Equal times keep their
/// original order.
pub fn upcoming(mut departures: Vec<Departure>, now: NaiveTime, limit: usize) -> Vec<Departure> {
    let now_min = i64::from(now.hour() * 60 + now.minute());
    departures.sort_by_key(|d| {
        let t = d.effective_time();
        (i64::from(t.hour() * 60 + t.minute()) - now_min).rem_euclid(24 * 60)
    });
    departures.truncate(limit);
    departures
}

// -- ODPT wire format --

#[derive(Deserialize)]
struct StationTimetable {
    #[serde(rename = "odpt:stationTimetableObject")]
    objects: Option<Vec<TimetableObject>>,
}

#[derive(Deserialize)]
struct TimetableObject {
    #[serde(rename = "odpt:departureTime")]
    departure_time: String,
    #[serde(rename = "odpt:trainType", default)]
    train_type: String,
    #[serde(rename = "odpt:destinationStation", default)]
    destination_station: Vec<String>,
    #[serde(rename = "odpt:trainNumber")]
    train_number: Option<String>,
    #[serde(rename = "odpt:platformNumber")]
    platform_number: Option<String>,
}

#[derive(Deserialize)]
struct TrainStatus {
    #[serde(rename = "odpt:trainNumber")]
    train_number: Option<String>,
    #[serde(rename = "odpt:delay")]
    delay: Option<u32>,
}

/// Parse a `odpt:StationTimetable` response body.
///
/// A body without any timetable object yields an empty list.
pub fn parse_timetable(body: &str) -> Result<Vec<Departure>, FetchError> {
    let tables: Vec<StationTimetable> = serde_json::from_str(body)?;
    let objects = tables
        .into_iter()
        .find_map(|t| t.objects)
        .unwrap_or_default();
    debug!(count = objects.len(), "timetable objects received");

    objects
        .into_iter()
        .map(|obj| -> Result<Departure, FetchError> {
            let time = NaiveTime::parse_from_str(obj.departure_time.trim(), "%H:%M")
                .map_err(|e| FetchError::Parse(format!("{:?}: {e}", obj.departure_time)))?;
            // Destination ids look like odpt.Station:Tokyu.Oimachi.Mizonokuchi
            let destination = obj
                .destination_station
                .last()
                .and_then(|id| id.rsplit('.').next())
                .unwrap_or_default();

            let mut departure = Departure::new(destination, time)
                .with_train_type(TrainType::from_provider_id(&obj.train_type));
            departure.train_number = obj.train_number;
            departure.platform = obj.platform_number;
            Ok(departure)
        })
        .collect()
}

/// Parse a `odpt:Train` response into train number → delay minutes.
pub fn parse_delays(body: &str) -> Result<HashMap<String, u32>, FetchError> {
    let trains: Vec<TrainStatus> = serde_json::from_str(body)?;
    Ok(trains
        .into_iter()
        .filter_map(|t| Some((t.train_number?, t.delay? / 60)))
        .collect())
}

/// Apply realtime delays to departures with a matching train number.
pub fn apply_delays(departures: Vec<Departure>, delays: &HashMap<String, u32>) -> Vec<Departure> {
    departures
        .into_iter()
        .map(|d| {
            match d.train_number.as_ref().and_then(|n| delays.get(n)).copied() {
                Some(minutes) => d.with_delay(minutes),
                None => d,
            }
        })
        .collect()
}

/// ODPT API client.
#[derive(Clone)]
pub struct OdptClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    realtime: bool,
}

impl OdptClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        realtime: bool,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            realtime,
        })
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("acl:consumerKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }

    async fn timetable(&self, station: &Station) -> Result<Vec<Departure>, FetchError> {
        let body = self
            .get(
                "odpt:StationTimetable",
                &[
                    ("odpt:station", format!("odpt.Station:{}", station.id)),
                    (
                        "odpt:railDirection",
                        format!("odpt.RailDirection:{}", station.direction),
                    ),
                ],
            )
            .await?;
        parse_timetable(&body)
    }

    async fn delays(&self, station: &Station) -> Result<HashMap<String, u32>, FetchError> {
        let body = self
            .get(
                "odpt:Train",
                &[("odpt:railway", format!("odpt.Railway:{}", station.railway()))],
            )
            .await?;
        parse_delays(&body)
    }
}

impl DepartureSource for OdptClient {
    async fn fetch(&self, station: &Station) -> Result<Vec<Departure>, FetchError> {
        info!(station = %station.id, direction = %station.direction, "querying ODPT timetable");
        let departures = self.timetable(station).await?;
        info!(count = departures.len(), "got train times");

        if !self.realtime || departures.is_empty() {
            return Ok(departures);
        }
        match self.delays(station).await {
            Ok(delays) => {
                debug!(trains = delays.len(), "realtime delays received");
                Ok(apply_delays(departures, &delays))
            }
            Err(err) => {
                warn!(error = %err, "realtime delay fetch failed, using timetable only");
                Ok(departures)
            }
        }
    }
}
