use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed xml at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("unexpected closing tag: {0}")]
    UnexpectedClose(String),

    #[error("unterminated element: {0}")]
    Unterminated(String),

    #[error("text outside of the root element")]
    TextOutsideRoot,

    #[error("document has no root element")]
    MissingRoot,

    #[error("document has more than one root element: {0}")]
    MultipleRoots(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path or path segment")]
    Empty,

    #[error("path starts at {expected} but the root element is {found}")]
    RootMismatch { expected: String, found: String },

    #[error("no {segment} element under {parent}")]
    Missing { segment: String, parent: String },

    #[error("cannot replace the root element {0}")]
    RootReplacement(String),
}

#[derive(Error, Debug)]
pub enum DecodingError {
    #[error("invalid vmi json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("domain parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("domain path error: {0}")]
    Path(#[from] PathError),

    #[error("vmi decoding error: {0}")]
    Decoding(#[from] DecodingError),
}
