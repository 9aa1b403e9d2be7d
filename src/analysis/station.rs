//! Tide gauge station metadata and lookup.
//!
//! Stations are matched to a site by planar distance in degree space,
//! which is adequate for picking the closest gauge along one stretch of
//! coast.

use thiserror::Error;

/// Error for malformed coordinate strings.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("invalid coordinate '{0}': expected degrees, minutes[, seconds] and N/S/E/W")]
    Invalid(String),
}

/// Metadata for a tide gauge station.
#[derive(Clone, Debug, PartialEq)]
pub struct TideGaugeStation {
    /// Station identifier/name
    pub name: String,
    /// Longitude (degrees East)
    pub longitude: f64,
    /// Latitude (degrees North)
    pub latitude: f64,
    /// Date the station was established, as published
    pub established: Option<String>,
    /// Vertical datum offset (m) - add to observations to match model datum
    pub datum_offset: f64,
}

impl TideGaugeStation {
    /// Create a new tide gauge station.
    ///
    /// # Arguments
    /// * `name` - Station name/identifier
    /// * `longitude` - Longitude in degrees East
    /// * `latitude` - Latitude in degrees North
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            name: name.into(),
            longitude,
            latitude,
            established: None,
            datum_offset: 0.0,
        }
    }

    /// Set the establishment date.
    pub fn with_established(mut self, established: impl Into<String>) -> Self {
        self.established = Some(established.into());
        self
    }

    /// Set vertical datum offset.
    pub fn with_datum_offset(mut self, offset: f64) -> Self {
        self.datum_offset = offset;
        self
    }

    /// Planar distance in degrees to a point.
    pub fn distance_to(&self, longitude: f64, latitude: f64) -> f64 {
        (self.longitude - longitude).hypot(self.latitude - latitude)
    }
}

/// Closest station to (longitude, latitude); the first one wins ties.
pub fn nearest_station(
    stations: &[TideGaugeStation],
    longitude: f64,
    latitude: f64,
) -> Option<&TideGaugeStation> {
    stations.iter().fold(None, |best: Option<&TideGaugeStation>, s| match best {
        Some(b) if b.distance_to(longitude, latitude) <= s.distance_to(longitude, latitude) => {
            Some(b)
        }
        _ => Some(s),
    })
}

/// Parse a degree/minute(/second) coordinate such as `30° 24.5' N` or
/// `88°04'30" W` into signed decimal degrees.
pub fn parse_dms(text: &str) -> Result<f64, CoordinateError> {
    let invalid = || CoordinateError::Invalid(text.to_string());

    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '°' | '\'' | '"' | '′' | '″' => ' ',
            _ => c,
        })
        .collect();
    let mut parts: Vec<&str> = cleaned.split_whitespace().collect();

    let sign = match parts.pop() {
        Some("N" | "n" | "E" | "e") => 1.0,
        Some("S" | "s" | "W" | "w") => -1.0,
        _ => return Err(invalid()),
    };
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let mut value = 0.0;
    let mut scale = 1.0;
    for part in parts {
        let v: f64 = part.parse().map_err(|_| invalid())?;
        value += v / scale;
        scale *= 60.0;
    }

    Ok(sign * value)
}
