use crate::gpx_types::GpxTrackpoint;
use crate::xml::{split_qname, XmlElement};

/// Namespace prefix used when emitting trackpoint extension elements
/// (Garmin's TrackPointExtension schema).
pub const TRACKPOINT_EXTENSION_PREFIX: &str = "gpxtpx";

/// Heart rate and cadence values carried in a trackpoint's `<extensions>`
/// sub-tree. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackpointExtensions {
    pub heart_rate: Option<u32>,
    pub cadence: Option<u32>,
}

/// Extract heart rate and cadence from an `<extensions>` element.
///
/// Matching is on local names: any child whose local name is
/// `TrackPointExtension` is scanned for `hr` and `cad` children,
/// whatever prefix the document declared them under. Everything else
/// under `<extensions>` is ignored.
pub fn decode(extensions: &XmlElement) -> TrackpointExtensions {
    let mut values = TrackpointExtensions::default();

    for child in extensions.elements() {
        if split_qname(&child.name).1 != "TrackPointExtension" {
            continue;
        }
        for field in child.elements() {
            match split_qname(&field.name).1 {
                "hr" => {
                    if let Ok(hr) = field.text().trim().parse::<u32>() {
                        values.heart_rate = Some(hr);
                    }
                }
                "cad" => {
                    if let Ok(cad) = field.text().trim().parse::<u32>() {
                        values.cadence = Some(cad);
                    }
                }
                _ => {}
            }
        }
    }

    values
}

/// Build the `<extensions>` element for a trackpoint, or `None` when the
/// trackpoint carries neither heart rate nor cadence. Emitted elements
/// use the fixed [`TRACKPOINT_EXTENSION_PREFIX`].
pub fn encode(point: &GpxTrackpoint) -> Option<XmlElement> {
    if point.heart_rate.is_none() && point.cadence.is_none() {
        return None;
    }

    let mut tpx = XmlElement::new(prefixed("TrackPointExtension"));
    if let Some(hr) = point.heart_rate {
        tpx.push_element(XmlElement::with_text(prefixed("hr"), hr.to_string()));
    }
    if let Some(cad) = point.cadence {
        tpx.push_element(XmlElement::with_text(prefixed("cad"), cad.to_string()));
    }

    let mut extensions = XmlElement::new("extensions");
    extensions.push_element(tpx);
    Some(extensions)
}

fn prefixed(local: &str) -> String {
    format!("{TRACKPOINT_EXTENSION_PREFIX}:{local}")
}
