use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::GpxError;
use crate::extensions;
use crate::gpx_types::*;
use crate::xml::{self, XmlElement};

type Result<T> = std::result::Result<T, GpxError>;

/// Parse a GPX XML string into the domain model.
///
/// Fails when the text is not well-formed XML or when the root element is
/// not `<gpx>`. Waypoints and trackpoints without both `lat` and `lon`
/// attributes are dropped from the result, not reported as errors.
pub fn parse_gpx(text: &str) -> Result<Gpx> {
    let root = xml::parse(text)?;
    if xml::split_qname(&root.name).1 != "gpx" {
        return Err(GpxError::NotGpx(root.name.clone()));
    }

    Ok(Gpx {
        metadata: parse_metadata(&root),
        waypoints: parse_waypoints(&root),
        tracks: parse_tracks(&root),
    })
}

fn parse_metadata(root: &XmlElement) -> GpxMetadata {
    let mut metadata = GpxMetadata {
        creator: root.attr("creator").map(str::to_string),
        ..Default::default()
    };

    if let Some(block) = root.child("metadata") {
        metadata.name = child_text(block, "name");
        metadata.description = child_text(block, "desc");
        metadata.time = child_time(block, "time");
    }

    metadata
}

/// `None` when the document has no `<wpt>` elements at all; otherwise the
/// waypoints that carried coordinates, in document order.
fn parse_waypoints(root: &XmlElement) -> Option<Vec<GpxWaypoint>> {
    let mut found = false;
    let mut waypoints = Vec::new();

    for wpt in root.children_named("wpt") {
        found = true;
        let Some((lat, lon)) = coordinates(wpt) else {
            debug!("skipping <wpt> without lat/lon attributes");
            continue;
        };

        let mut waypoint = GpxWaypoint::new(lat, lon);
        waypoint.time = child_time(wpt, "time");
        waypoint.name = child_text(wpt, "name");
        waypoint.description = child_text(wpt, "desc");
        waypoint.symbol = child_text(wpt, "sym");
        waypoint.altitude = child_number(wpt, "ele");
        waypoints.push(waypoint);
    }

    found.then_some(waypoints)
}

/// `None` when the document has no `<trk>` elements at all.
fn parse_tracks(root: &XmlElement) -> Option<Vec<GpxTrack>> {
    let mut found = false;
    let mut tracks = Vec::new();

    for trk in root.children_named("trk") {
        found = true;
        let mut track = GpxTrack {
            name: child_text(trk, "name"),
            ..Default::default()
        };

        for trkseg in trk.children_named("trkseg") {
            // The declared count still includes any trackpoints dropped
            // below for missing coordinates.
            track.segments.push(trkseg.children_named("trkpt").count());

            for trkpt in trkseg.children_named("trkpt") {
                let Some((lat, lon)) = coordinates(trkpt) else {
                    debug!("skipping <trkpt> without lat/lon attributes");
                    continue;
                };

                let mut point = GpxTrackpoint::new(lat, lon);
                point.time = child_time(trkpt, "time");
                point.altitude = child_number(trkpt, "ele");
                point.speed = child_number(trkpt, "speed");

                if let Some(ext) = trkpt.child("extensions") {
                    let values = extensions::decode(ext);
                    point.heart_rate = values.heart_rate;
                    point.cadence = values.cadence;
                }

                track.trackpoints.push(point);
            }
        }

        tracks.push(track);
    }

    found.then_some(tracks)
}

/// Require both coordinate attributes on a point element. The values
/// themselves parse permissively: non-numeric text becomes NaN.
fn coordinates(e: &XmlElement) -> Option<(f64, f64)> {
    let lat = e.attr("lat")?;
    let lon = e.attr("lon")?;
    Some((parse_number(lat), parse_number(lon)))
}

fn child_text(parent: &XmlElement, name: &str) -> Option<String> {
    parent.child(name).map(|e| e.text())
}

fn child_number(parent: &XmlElement, name: &str) -> Option<f64> {
    parent.child(name).map(|e| parse_number(&e.text()))
}

fn child_time(parent: &XmlElement, name: &str) -> Option<DateTime<Utc>> {
    parent.child(name).and_then(|e| parse_time(&e.text()))
}

fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(text.trim()) {
        Ok(time) => Some(time.with_timezone(&Utc)),
        Err(e) => {
            debug!(text, error = %e, "ignoring unparseable timestamp");
            None
        }
    }
}
