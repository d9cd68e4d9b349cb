use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete GPX document: file-level metadata plus waypoint and track
/// lists. A list is `None` when the corresponding elements were absent
/// from the document, as opposed to present but empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gpx {
    pub metadata: GpxMetadata,
    pub waypoints: Option<Vec<GpxWaypoint>>,
    pub tracks: Option<Vec<GpxTrack>>,
}

/// File-level metadata. `creator` comes from the root element attribute,
/// the rest from the `<metadata>` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

/// A single point of interest (`<wpt>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpxWaypoint {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub altitude: Option<f64>,
}

impl GpxWaypoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            time: None,
            name: None,
            description: None,
            symbol: None,
            altitude: None,
        }
    }
}

/// A recorded track (`<trk>`).
///
/// Trackpoints are kept as one flat list; `segments` describes how that
/// list divides into `<trkseg>` groups: `segments[i]` is the number of
/// consecutive trackpoints belonging to segment `i`, starting where
/// segment `i - 1` ended. For a consistent track the counts sum to
/// `trackpoints.len()`, though parsing can record a higher count when a
/// trackpoint was dropped for missing coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub trackpoints: Vec<GpxTrackpoint>,
    pub segments: Vec<usize>,
}

/// One position sample within a track segment (`<trkpt>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxTrackpoint {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<DateTime<Utc>>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub cadence: Option<u32>,
    pub heart_rate: Option<u32>,
}

impl GpxTrackpoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            time: None,
            altitude: None,
            speed: None,
            cadence: None,
            heart_rate: None,
        }
    }
}
