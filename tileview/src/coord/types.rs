//! Geographic and temporal value types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Minimum longitude of the world grid in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude of the world grid in degrees.
pub const MAX_LON: f64 = 180.0;
/// Minimum latitude of the world grid in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum latitude of the world grid in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Angular width of the world in degrees.
pub const WORLD_WIDTH: f64 = MAX_LON - MIN_LON;
/// Angular height of the world in degrees.
pub const WORLD_HEIGHT: f64 = MAX_LAT - MIN_LAT;

/// Errors produced while parsing or validating coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Bounds string did not contain four comma separated numbers.
    #[error("Invalid bounds '{0}': expected 'left,bottom,right,top'")]
    InvalidBounds(String),

    /// A coordinate was not a finite number.
    #[error("Invalid coordinate '{0}'")]
    InvalidNumber(String),

    /// A timestamp could not be parsed.
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Time range end precedes its start.
    #[error("Time range ends before it starts: {start} > {end}")]
    InvertedTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// An axis-aligned geographic rectangle in degrees.
///
/// Longitudes may describe an interval crossing the antimeridian, in which
/// case `left > right`. See [`Bounds::normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Western edge (longitude)
    pub left: f64,
    /// Southern edge (latitude)
    pub bottom: f64,
    /// Eastern edge (longitude)
    pub right: f64,
    /// Northern edge (latitude)
    pub top: f64,
}

impl Bounds {
    /// Create bounds from raw edges. No normalization is applied.
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// The whole world, `-180,-90,180,90`.
    pub const fn world() -> Self {
        Self::new(MIN_LON, MIN_LAT, MAX_LON, MAX_LAT)
    }
}

/// Formats as the canonical tile identity encoding `left,bottom,right,top`.
///
/// Uses shortest round-trip decimal formatting, so `0.0` renders as `0` and
/// `2.8125` as `2.8125`.
impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.bottom, self.right, self.top
        )
    }
}

impl FromStr for Bounds {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoordError::InvalidBounds(s.to_string()));
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            let value: f64 = part
                .parse()
                .map_err(|_| CoordError::InvalidNumber(part.to_string()))?;
            if !value.is_finite() {
                return Err(CoordError::InvalidNumber(part.to_string()));
            }
            *slot = value;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// A closed time interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, rejecting inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoordError> {
        if start > end {
            return Err(CoordError::InvertedTimeRange { start, end });
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT)
        )
    }
}

impl FromStr for TimeRange {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(',')
            .ok_or_else(|| CoordError::InvalidTimestamp(s.to_string()))?;
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an ISO-8601 timestamp, with or without a zone suffix.
///
/// Timestamps without a zone are taken as UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CoordError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| CoordError::InvalidTimestamp(s.to_string()))
}

/// The visible window: spatial bounds and an optional time range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub bounds: Bounds,
    pub time: Option<TimeRange>,
}

impl View {
    /// A purely spatial view.
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds, time: None }
    }

    /// A view restricted to a time range.
    pub fn with_time(bounds: Bounds, time: TimeRange) -> Self {
        Self {
            bounds,
            time: Some(time),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.time {
            Some(time) => write!(f, "{};{}", time, self.bounds),
            None => write!(f, "{}", self.bounds),
        }
    }
}

/// Parses `start,end;left,bottom,right,top` or plain `left,bottom,right,top`.
impl FromStr for View {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(';') {
            Some((time, bounds)) => Ok(Self::with_time(bounds.parse()?, time.parse()?)),
            None => Ok(Self::new(s.parse()?)),
        }
    }
}

impl From<Bounds> for View {
    fn from(bounds: Bounds) -> Self {
        Self::new(bounds)
    }
}
