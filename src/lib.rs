//! # Train Board Core Library
//!
//! This library provides the data model and rendering engine for the train
//! departure board: a Raspberry Pi with a small character LCD that shows the
//! next trains leaving a configured station.
//!
//! ## Design Philosophy
//!
//! ### Deterministic Animation
//! - **Explicit time**: every animation step receives the elapsed time as a
//!   parameter, so scrolling is tested without sleeping
//! - **Owned state**: the board state lives in a [`board::BoardRenderer`] value,
//!   never in globals, so several boards can coexist
//! - **Whole frames**: a [`grid::BoardGrid`] is always complete; there is no
//!   partial-grid update path
//!
//! ### Data Flow
//! 1. **Fetch**: [`departures::DepartureSource`] returns the station's departures
//! 2. **Order**: [`departures::upcoming`] sorts them relative to "now" and trims
//! 3. **Update**: [`board::BoardRenderer::update`] replaces each slot's text
//! 4. **Animate**: `tick` + `frame` at the animation cadence → [`display::DisplaySink`]
//!
//! ## Core Types
//!
//! - [`Departure`]: one upcoming train
//! - [`TrainType`]: service class with a compact display code

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod board;
pub mod config;
pub mod departures;
pub mod display;
pub mod field;
pub mod grid;
pub mod layout;
#[cfg(feature = "hardware")]
pub mod lcd_i2c;
pub mod refresh;

/// Service class of a train.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainType {
    Local,
    Express,
    /// Any other service, holding the provider's short type name
    Other(String),
}

impl TrainType {
    /// Classify a provider train type id such as `odpt.TrainType:Tokyu.Express`.
    ///
    /// Names containing `Local` win over `Express`, so a "SemiExpressLocal"
    /// style id is treated as a local service.
    pub fn from_provider_id(id: &str) -> Self {
        if id.contains("Local") {
            TrainType::Local
        } else if id.contains("Express") {
            TrainType::Express
        } else {
            let short = id.rsplit(['.', ':']).next().unwrap_or(id);
            TrainType::Other(short.to_string())
        }
    }

    /// Compact code used on the display.
    pub fn short_code(&self) -> &str {
        match self {
            TrainType::Local => "Loc",
            TrainType::Express => "EXP",
            TrainType::Other(name) => name,
        }
    }
}

/// One upcoming train departure.
///
/// `scheduled_time` is always kept; when realtime data shifts the departure,
/// `estimated_time` holds the new time and is what the board shows.
///
/// # Example
/// ```
/// use chrono::NaiveTime;
/// use train_board_lib::{Departure, TrainType};
///
/// let dep = Departure::new("Oimachi", NaiveTime::from_hms_opt(8, 15, 0).unwrap())
///     .with_train_type(TrainType::Express)
///     .with_delay(3);
///
/// assert_eq!(dep.effective_time(), NaiveTime::from_hms_opt(8, 18, 0).unwrap());
/// assert_eq!(dep.scheduled_time, NaiveTime::from_hms_opt(8, 15, 0).unwrap());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Human-readable destination station name
    pub destination: String,
    /// Timetabled departure time of day
    pub scheduled_time: NaiveTime,
    /// Realtime departure time, present only when it differs from the schedule
    pub estimated_time: Option<NaiveTime>,
    /// Minutes behind schedule
    pub delay_minutes: u32,
    pub train_type: TrainType,
    /// Platform or track, when the provider publishes it
    pub platform: Option<String>,
    /// Provider train number, used to join realtime delay data
    pub train_number: Option<String>,
}

impl Departure {
    pub fn new(destination: impl Into<String>, scheduled_time: NaiveTime) -> Self {
        Self {
            destination: destination.into(),
            scheduled_time,
            estimated_time: None,
            delay_minutes: 0,
            train_type: TrainType::Local,
            platform: None,
            train_number: None,
        }
    }

    pub fn with_train_type(mut self, train_type: TrainType) -> Self {
        self.train_type = train_type;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_train_number(mut self, number: impl Into<String>) -> Self {
        self.train_number = Some(number.into());
        self
    }

    /// Apply a realtime delay. A zero delay clears any estimate.
    pub fn with_delay(mut self, minutes: u32) -> Self {
        self.delay_minutes = minutes;
        self.estimated_time = if minutes > 0 {
            // NaiveTime arithmetic wraps past midnight
            Some(self.scheduled_time + Duration::minutes(i64::from(minutes)))
        } else {
            None
        };
        self
    }

    /// Time the board shows: the estimate when present, else the schedule.
    pub fn effective_time(&self) -> NaiveTime {
        self.estimated_time.unwrap_or(self.scheduled_time)
    }
}
