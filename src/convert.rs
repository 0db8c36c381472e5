// src/convert.rs - Flavor specific converters feeding an output sink
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;

use crate::attributes::JobAttributes;
use crate::document::{DocFlavor, Document, PageStatus, Payload, Representation};

/// Failures while moving a document to its output sink. These never reach
/// the submitting caller; the job reports them as a failed event.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("No converter accepts document flavor {0}")]
    UnsupportedFormat(DocFlavor),
    #[error("Payload does not match document flavor {0}")]
    PayloadMismatch(DocFlavor),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Converts documents of the flavors it supports into one output format.
pub trait Converter: Send + Sync {
    fn output_mime_type(&self, flavor: &DocFlavor) -> String;
    fn supports(&self, flavor: &DocFlavor) -> bool;
    fn convert(
        &self,
        document: &dyn Document,
        attributes: &JobAttributes,
        sink: &mut dyn Write,
    ) -> Result<(), TransferError>;
}

/// Ordered converter list; the first converter supporting a flavor wins.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn lookup(&self, flavor: &DocFlavor) -> Option<Arc<dyn Converter>> {
        self.converters.iter().find(|c| c.supports(flavor)).cloned()
    }

    pub fn supports(&self, flavor: &DocFlavor) -> bool {
        self.converters.iter().any(|c| c.supports(flavor))
    }

    /// The well known flavors some converter accepts.
    pub fn supported_flavors(&self) -> Vec<DocFlavor> {
        DocFlavor::WELL_KNOWN
            .into_iter()
            .filter(|f| self.supports(f))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for ConverterRegistry {
    /// PostScript rendering for service formatted documents plus raw
    /// pass-through for byte documents.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PostScriptConverter));
        registry.register(Arc::new(RawConverter::default()));
        registry
    }
}

/// Wraps rendered pages of `Printable`/`Pageable` documents in DSC framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostScriptConverter;

impl PostScriptConverter {
    fn write_page(sink: &mut dyn Write, number: usize, page: &[u8]) -> io::Result<()> {
        writeln!(sink, "%%Page: {} {}", number, number)?;
        sink.write_all(page)?;
        if !page.ends_with(b"\n") && !page.is_empty() {
            writeln!(sink)?;
        }
        writeln!(sink, "showpage")
    }
}

impl Converter for PostScriptConverter {
    fn output_mime_type(&self, _flavor: &DocFlavor) -> String {
        "application/postscript".to_string()
    }

    fn supports(&self, flavor: &DocFlavor) -> bool {
        *flavor == DocFlavor::PRINTABLE || *flavor == DocFlavor::PAGEABLE
    }

    fn convert(
        &self,
        document: &dyn Document,
        attributes: &JobAttributes,
        sink: &mut dyn Write,
    ) -> Result<(), TransferError> {
        writeln!(sink, "%!PS-Adobe-3.0")?;
        writeln!(sink, "%%Title: {}", attributes.job_name())?;
        writeln!(sink, "%%For: {}", attributes.originating_user())?;
        writeln!(sink, "%%Pages: (atend)")?;
        writeln!(sink, "%%EndComments")?;

        let mut pages = 0;
        let mut page = Vec::new();
        for _ in 0..attributes.copies().max(1) {
            match document.payload() {
                Payload::Printable(printable) => {
                    // page indexes restart for every copy
                    for index in 0.. {
                        page.clear();
                        match printable.print_page(index, &mut page)? {
                            PageStatus::Exists => {
                                pages += 1;
                                Self::write_page(sink, pages, &page)?;
                            }
                            PageStatus::NoSuchPage => break,
                        }
                    }
                }
                Payload::Pageable(pageable) => {
                    for index in 0..pageable.page_count() {
                        page.clear();
                        pageable.print_page(index, &mut page)?;
                        pages += 1;
                        Self::write_page(sink, pages, &page)?;
                    }
                }
                _ => return Err(TransferError::PayloadMismatch(document.flavor().clone())),
            }
        }

        writeln!(sink, "%%Trailer")?;
        writeln!(sink, "%%Pages: {}", pages)?;
        writeln!(sink, "%%EOF")?;
        tracing::debug!("Rendered {} PostScript pages for '{}'", pages, attributes.job_name());
        Ok(())
    }
}

/// Copies byte documents verbatim.
#[derive(Debug, Clone)]
pub struct RawConverter {
    mime_types: Vec<String>,
}

impl Default for RawConverter {
    fn default() -> Self {
        Self::new([
            DocFlavor::POSTSCRIPT_BYTES.mime_type(),
            DocFlavor::PDF_BYTES.mime_type(),
            DocFlavor::TEXT_PLAIN_BYTES.mime_type(),
            DocFlavor::OCTET_STREAM_BYTES.mime_type(),
        ])
    }
}

impl RawConverter {
    pub fn new<I, S>(mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mime_types: mime_types.into_iter().map(Into::into).collect(),
        }
    }
}

impl Converter for RawConverter {
    fn output_mime_type(&self, flavor: &DocFlavor) -> String {
        flavor.mime_type().to_string()
    }

    fn supports(&self, flavor: &DocFlavor) -> bool {
        flavor.representation() == Representation::Bytes
            && self.mime_types.iter().any(|m| m == flavor.mime_type())
    }

    fn convert(
        &self,
        document: &dyn Document,
        attributes: &JobAttributes,
        sink: &mut dyn Write,
    ) -> Result<(), TransferError> {
        let Payload::Bytes(bytes) = document.payload() else {
            return Err(TransferError::PayloadMismatch(document.flavor().clone()));
        };
        for _ in 0..attributes.copies().max(1) {
            sink.write_all(bytes)?;
        }
        Ok(())
    }
}
