//! Bidirectional transform between GPX 1.1 XML text and an in-memory
//! track/waypoint model.
//!
//! [`parse_gpx`] turns GPX text into a [`Gpx`] value; [`build_gpx`] turns
//! a [`Gpx`] value back into GPX text. Track segmentation is modelled as
//! a flat trackpoint list plus per-segment point counts, and Garmin-style
//! `gpxtpx` trackpoint extensions (heart rate, cadence) survive the round
//! trip.
//!
//! ```
//! use gpx_roundtrip::parse_gpx;
//!
//! let gpx = parse_gpx(r#"<gpx creator="example">
//!   <wpt lat="35.6762" lon="139.6503"><name>Tokyo Tower</name></wpt>
//! </gpx>"#)?;
//! assert_eq!(gpx.metadata.creator.as_deref(), Some("example"));
//! assert_eq!(gpx.waypoints.unwrap().len(), 1);
//! # Ok::<(), gpx_roundtrip::GpxError>(())
//! ```

pub mod builder;
pub mod error;
pub mod extensions;
pub mod gpx_types;
pub mod parser;
pub mod xml;

pub use builder::{build_gpx, build_gpx_at, GPX_NAMESPACE};
pub use error::GpxError;
pub use gpx_types::{Gpx, GpxMetadata, GpxTrack, GpxTrackpoint, GpxWaypoint};
pub use parser::parse_gpx;
