use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpxError {
    /// The underlying XML text is not well-formed.
    #[error("could not parse GPX document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML whose root element is not `<gpx>`.
    #[error("root element is <{0}>, expected <gpx>")]
    NotGpx(String),

    /// The document contains no root element at all.
    #[error("document has no root element")]
    EmptyDocument,

    /// Failure while writing serialized output.
    #[error("could not write GPX document: {0}")]
    Io(#[from] std::io::Error),
}
