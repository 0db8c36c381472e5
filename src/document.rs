//! Documents handed to a print job: a declared flavor, optional attributes and
//! an opaque payload. The printing core never looks inside the payload; it only
//! forwards it to the converter registered for the flavor.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::attributes::AttributeSet;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("payload of kind {payload:?} does not match flavor {flavor}")]
    RepresentationMismatch {
        flavor: DocFlavor,
        payload: Representation,
    },
}

/// How the payload of a document is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Printable,
    Pageable,
    Bytes,
    Url,
}

impl Representation {
    fn as_str(&self) -> &'static str {
        match self {
            Representation::Printable => "printable",
            Representation::Pageable => "pageable",
            Representation::Bytes => "bytes",
            Representation::Url => "url",
        }
    }
}

const SERVICE_FORMATTED: &str = "application/x-service-formatted";

/// Content format identifier: a MIME type plus a payload representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocFlavor {
    mime_type: Cow<'static, str>,
    representation: Representation,
}

impl DocFlavor {
    pub const PRINTABLE: DocFlavor = DocFlavor::from_static(SERVICE_FORMATTED, Representation::Printable);
    pub const PAGEABLE: DocFlavor = DocFlavor::from_static(SERVICE_FORMATTED, Representation::Pageable);
    pub const POSTSCRIPT_BYTES: DocFlavor = DocFlavor::from_static("application/postscript", Representation::Bytes);
    pub const PDF_BYTES: DocFlavor = DocFlavor::from_static("application/pdf", Representation::Bytes);
    pub const TEXT_PLAIN_BYTES: DocFlavor = DocFlavor::from_static("text/plain; charset=utf-8", Representation::Bytes);
    pub const OCTET_STREAM_BYTES: DocFlavor = DocFlavor::from_static("application/octet-stream", Representation::Bytes);
    pub const PDF_URL: DocFlavor = DocFlavor::from_static("application/pdf", Representation::Url);
    pub const POSTSCRIPT_URL: DocFlavor = DocFlavor::from_static("application/postscript", Representation::Url);

    /// Every flavor constant above.
    pub const WELL_KNOWN: [DocFlavor; 8] = [
        Self::PRINTABLE,
        Self::PAGEABLE,
        Self::POSTSCRIPT_BYTES,
        Self::PDF_BYTES,
        Self::TEXT_PLAIN_BYTES,
        Self::OCTET_STREAM_BYTES,
        Self::PDF_URL,
        Self::POSTSCRIPT_URL,
    ];

    const fn from_static(mime_type: &'static str, representation: Representation) -> Self {
        Self {
            mime_type: Cow::Borrowed(mime_type),
            representation,
        }
    }

    pub fn new(mime_type: impl Into<String>, representation: Representation) -> Self {
        Self {
            mime_type: Cow::Owned(mime_type.into()),
            representation,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }
}

impl fmt::Display for DocFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; class=\"{}\"", self.mime_type, self.representation.as_str())
    }
}

impl Serialize for DocFlavor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of asking a [`Printable`] for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Exists,
    NoSuchPage,
}

/// Content that renders itself page by page until it reports `NoSuchPage`.
pub trait Printable: Send + Sync {
    fn print_page(&self, page_index: usize, out: &mut dyn Write) -> std::io::Result<PageStatus>;
}

/// Content with a known page count.
pub trait Pageable: Send + Sync {
    fn page_count(&self) -> usize;
    fn print_page(&self, page_index: usize, out: &mut dyn Write) -> std::io::Result<()>;
}

#[derive(Clone)]
pub enum Payload {
    Printable(Arc<dyn Printable>),
    Pageable(Arc<dyn Pageable>),
    Bytes(Arc<[u8]>),
    Url(String),
}

impl Payload {
    pub fn representation(&self) -> Representation {
        match self {
            Payload::Printable(_) => Representation::Printable,
            Payload::Pageable(_) => Representation::Pageable,
            Payload::Bytes(_) => Representation::Bytes,
            Payload::Url(_) => Representation::Url,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Printable(_) => f.write_str("Printable(..)"),
            Payload::Pageable(p) => write!(f, "Pageable({} pages)", p.page_count()),
            Payload::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Payload::Url(url) => write!(f, "Url({})", url),
        }
    }
}

/// A document submitted for printing.
pub trait Document: Send + Sync {
    fn flavor(&self) -> &DocFlavor;
    fn attributes(&self) -> Option<&AttributeSet>;
    fn payload(&self) -> &Payload;
}

#[derive(Debug, Clone)]
pub struct SimpleDoc {
    flavor: DocFlavor,
    payload: Payload,
    attributes: Option<AttributeSet>,
}

impl SimpleDoc {
    pub fn new(
        flavor: DocFlavor,
        payload: Payload,
        attributes: Option<AttributeSet>,
    ) -> Result<Self, DocumentError> {
        if flavor.representation() != payload.representation() {
            return Err(DocumentError::RepresentationMismatch {
                flavor,
                payload: payload.representation(),
            });
        }
        Ok(Self {
            flavor,
            payload,
            attributes,
        })
    }

    pub fn printable(printable: Arc<dyn Printable>, attributes: Option<AttributeSet>) -> Self {
        Self {
            flavor: DocFlavor::PRINTABLE,
            payload: Payload::Printable(printable),
            attributes,
        }
    }
}

impl Document for SimpleDoc {
    fn flavor(&self) -> &DocFlavor {
        &self.flavor
    }

    fn attributes(&self) -> Option<&AttributeSet> {
        self.attributes.as_ref()
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}
