use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::error::GpxError;
use crate::extensions;
use crate::gpx_types::*;
use crate::xml::{self, XmlElement};

type Result<T> = std::result::Result<T, GpxError>;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Serialize the model to GPX 1.1 XML text, stamping the current time
/// into `<metadata><time>` when the model leaves it unset.
pub fn build_gpx(gpx: &Gpx) -> Result<String> {
    build_gpx_at(gpx, Utc::now())
}

/// Like [`build_gpx`], but with the default-timestamp clock injected, so
/// output is deterministic.
pub fn build_gpx_at(gpx: &Gpx, now: DateTime<Utc>) -> Result<String> {
    let mut root = XmlElement::new("gpx");
    root.set_attr("version", "1.1");
    root.set_attr("xmlns", GPX_NAMESPACE);
    root.set_attr("creator", gpx.metadata.creator.clone().unwrap_or_default());

    root.push_element(build_metadata(&gpx.metadata, now));

    if let Some(waypoints) = &gpx.waypoints {
        for waypoint in waypoints {
            root.push_element(build_waypoint(waypoint));
        }
    }
    if let Some(tracks) = &gpx.tracks {
        for track in tracks {
            root.push_element(build_track(track));
        }
    }

    xml::serialize(&root)
}

fn build_metadata(metadata: &GpxMetadata, now: DateTime<Utc>) -> XmlElement {
    let mut block = XmlElement::new("metadata");
    block.push_element(XmlElement::with_text(
        "time",
        format_time(metadata.time.unwrap_or(now)),
    ));
    if let Some(name) = &metadata.name {
        block.push_element(XmlElement::with_text("name", name));
    }
    if let Some(description) = &metadata.description {
        block.push_element(XmlElement::with_text("desc", description));
    }
    block
}

fn build_waypoint(waypoint: &GpxWaypoint) -> XmlElement {
    let mut wpt = XmlElement::new("wpt");
    wpt.set_attr("lat", waypoint.lat.to_string());
    wpt.set_attr("lon", waypoint.lon.to_string());

    if let Some(name) = &waypoint.name {
        wpt.push_element(XmlElement::with_text("name", name));
    }
    if let Some(description) = &waypoint.description {
        wpt.push_element(XmlElement::with_text("desc", description));
    }
    if let Some(time) = waypoint.time {
        wpt.push_element(XmlElement::with_text("time", format_time(time)));
    }
    if let Some(symbol) = &waypoint.symbol {
        wpt.push_element(XmlElement::with_text("sym", symbol));
    }
    if let Some(altitude) = waypoint.altitude {
        wpt.push_element(XmlElement::with_text("ele", altitude.to_string()));
    }

    wpt
}

/// Regroup the flat trackpoint list into `<trkseg>` elements by consuming
/// the per-segment counts in order. A group closes as soon as it holds its
/// declared count, so a count of 0 yields an empty `<trkseg/>` rather than
/// consuming a point.
///
/// Mismatches are handled leniently rather than erroring: trackpoints
/// left over once the counts are exhausted are dropped, and counts that
/// run out of trackpoints mid-segment produce one short final segment.
/// Both cases log a warning. An empty trackpoint or segment list yields a
/// `<trk>` with no `<trkseg>` children.
fn build_track(track: &GpxTrack) -> XmlElement {
    let mut trk = XmlElement::new("trk");
    if let Some(name) = &track.name {
        trk.push_element(XmlElement::with_text("name", name));
    }
    if track.trackpoints.is_empty() || track.segments.is_empty() {
        return trk;
    }

    let mut points = track.trackpoints.iter();
    let mut remaining = track.trackpoints.len();

    for &declared in &track.segments {
        let mut segment = XmlElement::new("trkseg");
        for point in points.by_ref().take(declared) {
            segment.push_element(build_trackpoint(point));
        }

        let taken = segment.children.len();
        remaining -= taken;

        if taken < declared {
            // ran out of trackpoints; remaining counts are dropped
            if taken > 0 {
                warn!(
                    declared,
                    actual = taken,
                    "track ran out of trackpoints mid-segment, emitting a short final segment"
                );
                trk.push_element(segment);
            }
            return trk;
        }
        trk.push_element(segment);
    }

    if remaining > 0 {
        warn!(
            dropped = remaining,
            "track has more trackpoints than its segment counts declare, dropping the rest"
        );
    }

    trk
}

fn build_trackpoint(point: &GpxTrackpoint) -> XmlElement {
    let mut trkpt = XmlElement::new("trkpt");
    trkpt.set_attr("lat", point.lat.to_string());
    trkpt.set_attr("lon", point.lon.to_string());

    if let Some(time) = point.time {
        trkpt.push_element(XmlElement::with_text("time", format_time(time)));
    }
    if let Some(altitude) = point.altitude {
        trkpt.push_element(XmlElement::with_text("ele", altitude.to_string()));
    }
    if let Some(speed) = point.speed {
        trkpt.push_element(XmlElement::with_text("speed", speed.to_string()));
    }
    if let Some(ext) = extensions::encode(point) {
        trkpt.push_element(ext);
    }

    trkpt
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn build(gpx: &Gpx) -> String {
        build_gpx_at(gpx, fixed_now()).unwrap()
    }

    #[test]
    fn test_root_attributes() {
        let gpx = Gpx::default();
        let text = build(&gpx);
        assert!(text.contains(r#"version="1.1""#));
        assert!(text.contains(r#"xmlns="http://www.topografix.com/GPX/1/1""#));
        assert!(text.contains(r#"creator="""#));
    }

    #[test]
    fn test_metadata_time_defaults_to_now() {
        let text = build(&Gpx::default());
        assert!(text.contains("<time>2025-06-01T12:00:00.000Z</time>"));
    }

    #[test]
    fn test_metadata_time_preserved_when_set() {
        let mut gpx = Gpx::default();
        gpx.metadata.time = Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap());
        gpx.metadata.name = Some("Ride".into());
        gpx.metadata.creator = Some("UnitTest".into());

        let text = build(&gpx);
        assert!(text.contains("<time>2020-01-02T03:04:05.000Z</time>"));
        assert!(text.contains("<name>Ride</name>"));
        assert!(text.contains(r#"creator="UnitTest""#));
    }

    #[test]
    fn test_empty_lists_emit_nothing() {
        let gpx = Gpx {
            waypoints: Some(vec![]),
            tracks: Some(vec![]),
            ..Default::default()
        };
        let text = build(&gpx);
        assert!(!text.contains("<wpt"));
        assert!(!text.contains("<trk"));
    }

    #[test]
    fn test_waypoint_children() {
        let mut waypoint = GpxWaypoint::new(35.6762, 139.6503);
        waypoint.name = Some("Tokyo Tower".into());
        waypoint.symbol = Some("Flag".into());
        waypoint.altitude = Some(40.5);

        let gpx = Gpx {
            waypoints: Some(vec![waypoint]),
            ..Default::default()
        };
        let text = build(&gpx);
        assert!(text.contains(r#"<wpt lat="35.6762" lon="139.6503">"#));
        assert!(text.contains("<name>Tokyo Tower</name>"));
        assert!(text.contains("<sym>Flag</sym>"));
        assert!(text.contains("<ele>40.5</ele>"));
    }

    #[test]
    fn test_zero_altitude_emitted() {
        let mut waypoint = GpxWaypoint::new(1.0, 2.0);
        waypoint.altitude = Some(0.0);

        let gpx = Gpx {
            waypoints: Some(vec![waypoint]),
            ..Default::default()
        };
        assert!(build(&gpx).contains("<ele>0</ele>"));
    }

    #[test]
    fn test_segmentation_two_then_one() {
        let track = GpxTrack {
            name: Some("Split".into()),
            trackpoints: vec![
                GpxTrackpoint::new(35.0, 139.0),
                GpxTrackpoint::new(35.001, 139.001),
                GpxTrackpoint::new(36.0, 140.0),
            ],
            segments: vec![2, 1],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let reparsed = crate::parser::parse_gpx(&build(&gpx)).unwrap();
        let track = &reparsed.tracks.unwrap()[0];
        assert_eq!(track.segments, vec![2, 1]);
        assert_eq!(track.trackpoints.len(), 3);
    }

    #[test]
    fn test_excess_trackpoints_dropped() {
        let track = GpxTrack {
            name: None,
            trackpoints: vec![
                GpxTrackpoint::new(35.0, 139.0),
                GpxTrackpoint::new(35.001, 139.001),
                GpxTrackpoint::new(36.0, 140.0),
            ],
            segments: vec![2],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let reparsed = crate::parser::parse_gpx(&build(&gpx)).unwrap();
        let track = &reparsed.tracks.unwrap()[0];
        assert_eq!(track.segments, vec![2]);
        assert_eq!(track.trackpoints.len(), 2);
    }

    #[test]
    fn test_zero_count_segment_emitted_empty() {
        let track = GpxTrack {
            name: None,
            trackpoints: vec![
                GpxTrackpoint::new(35.0, 139.0),
                GpxTrackpoint::new(35.001, 139.001),
            ],
            segments: vec![0, 2],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let text = build(&gpx);
        assert!(text.contains("<trkseg/>"));

        let reparsed = crate::parser::parse_gpx(&text).unwrap();
        let track = &reparsed.tracks.unwrap()[0];
        assert_eq!(track.segments, vec![0, 2]);
        assert_eq!(track.trackpoints.len(), 2);
    }

    #[test]
    fn test_trailing_zero_count_segment_preserved() {
        let track = GpxTrack {
            name: None,
            trackpoints: vec![
                GpxTrackpoint::new(35.0, 139.0),
                GpxTrackpoint::new(35.001, 139.001),
            ],
            segments: vec![2, 0],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let reparsed = crate::parser::parse_gpx(&build(&gpx)).unwrap();
        let track = &reparsed.tracks.unwrap()[0];
        assert_eq!(track.segments, vec![2, 0]);
        assert_eq!(track.trackpoints.len(), 2);
    }

    #[test]
    fn test_underfilled_final_segment_emitted_short() {
        let track = GpxTrack {
            name: None,
            trackpoints: vec![
                GpxTrackpoint::new(35.0, 139.0),
                GpxTrackpoint::new(35.001, 139.001),
            ],
            segments: vec![5],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let reparsed = crate::parser::parse_gpx(&build(&gpx)).unwrap();
        let track = &reparsed.tracks.unwrap()[0];
        assert_eq!(track.segments, vec![2]);
    }

    #[test]
    fn test_empty_track_has_no_trkseg() {
        let track = GpxTrack {
            name: Some("Nothing yet".into()),
            trackpoints: vec![],
            segments: vec![],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };
        let text = build(&gpx);
        assert!(text.contains("<name>Nothing yet</name>"));
        assert!(!text.contains("<trkseg"));
    }

    #[test]
    fn test_trackpoint_extensions_emitted() {
        let mut point = GpxTrackpoint::new(35.0, 139.0);
        point.heart_rate = Some(150);
        point.cadence = Some(85);
        point.speed = Some(3.2);

        let track = GpxTrack {
            name: None,
            trackpoints: vec![point],
            segments: vec![1],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };

        let text = build(&gpx);
        assert!(text.contains("<gpxtpx:TrackPointExtension>"));
        assert!(text.contains("<gpxtpx:hr>150</gpxtpx:hr>"));
        assert!(text.contains("<gpxtpx:cad>85</gpxtpx:cad>"));
        assert!(text.contains("<speed>3.2</speed>"));
    }

    #[test]
    fn test_no_extensions_element_without_values() {
        let track = GpxTrack {
            name: None,
            trackpoints: vec![GpxTrackpoint::new(35.0, 139.0)],
            segments: vec![1],
        };
        let gpx = Gpx {
            tracks: Some(vec![track]),
            ..Default::default()
        };
        assert!(!build(&gpx).contains("<extensions"));
    }
}
