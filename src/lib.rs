//! Virtual printers for integration tests.
//!
//! A [`PrinterRegistry`] owns named [`VirtualPrinter`]s. Each printer hands out
//! single-use [`PrintJob`]s whose output lands in an in-memory or on-disk sink,
//! and counts how its jobs end. Nothing here talks to real print hardware.

pub mod attributes;
pub mod config;
pub mod convert;
pub mod document;
pub mod event;
pub mod management;
pub mod output;
pub mod print_job;
pub mod printer;
pub mod registry;
pub mod statistics;
pub mod test_page;
pub mod web;

pub use attributes::{Attribute, AttributeKind, AttributeSet, JobAttributes, JobEnvironment};
pub use document::{DocFlavor, Document, Payload, SimpleDoc};
pub use event::{JobEvent, JobEventKind, PrintJobListener};
pub use management::{ManagementDirectory, ManagementExposer, PrinterManagement};
pub use print_job::{JobId, JobState, PrintJob, PrintJobError};
pub use printer::{PrinterState, PrinterStatus, VirtualPrinter};
pub use registry::{PrinterRegistry, PrinterSettings, FALLBACK_PRINTER_NAME};
pub use statistics::StatisticsCollector;
