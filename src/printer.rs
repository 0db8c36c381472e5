// src/printer.rs - Virtual printer: name, accepting flag, flavors and statistics
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;

use crate::attributes::JobEnvironment;
use crate::convert::ConverterRegistry;
use crate::document::DocFlavor;
use crate::management::PrinterManagement;
use crate::output::{MemoryOutput, OutputTarget};
use crate::print_job::PrintJob;
use crate::statistics::StatisticsCollector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrinterState::Idle => "idle",
            PrinterState::Processing => "processing",
            PrinterState::Stopped => "stopped",
        })
    }
}

/// Read-only view of a printer for management clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterStatus {
    pub name: String,
    pub printer_state: PrinterState,
    pub accepting_jobs: bool,
    pub canceled: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: usize,
}

pub struct VirtualPrinter {
    name: String,
    accepting_jobs: AtomicBool,
    supported_flavors: Vec<DocFlavor>,
    stats: Arc<StatisticsCollector>,
    output: Arc<dyn OutputTarget>,
    converters: Arc<ConverterRegistry>,
    environment: JobEnvironment,
    on_remove: Box<dyn Fn() + Send + Sync>,
    self_ref: Weak<VirtualPrinter>,
}

pub struct VirtualPrinterBuilder {
    name: String,
    output: Option<Arc<dyn OutputTarget>>,
    converters: Option<Arc<ConverterRegistry>>,
    environment: Option<JobEnvironment>,
    on_remove: Option<Box<dyn Fn() + Send + Sync>>,
}

impl VirtualPrinterBuilder {
    pub fn output(mut self, output: Arc<dyn OutputTarget>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn converters(mut self, converters: Arc<ConverterRegistry>) -> Self {
        self.converters = Some(converters);
        self
    }

    pub fn environment(mut self, environment: JobEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Called by [`VirtualPrinter::remove`].
    pub fn on_remove(mut self, on_remove: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_remove = Some(Box::new(on_remove));
        self
    }

    pub fn build(self) -> Arc<VirtualPrinter> {
        let output = self
            .output
            .unwrap_or_else(|| Arc::new(MemoryOutput::new()));
        let converters = self.converters.unwrap_or_default();
        let environment = self.environment.unwrap_or_else(JobEnvironment::from_system);
        let on_remove = self.on_remove.unwrap_or_else(|| Box::new(|| {}));
        let supported_flavors = converters.supported_flavors();
        Arc::new_cyclic(|self_ref| VirtualPrinter {
            name: self.name,
            accepting_jobs: AtomicBool::new(true),
            supported_flavors,
            stats: Arc::new(StatisticsCollector::new()),
            output,
            converters,
            environment,
            on_remove,
            self_ref: self_ref.clone(),
        })
    }
}

impl VirtualPrinter {
    pub fn builder(name: impl Into<String>) -> VirtualPrinterBuilder {
        VirtualPrinterBuilder {
            name: name.into(),
            output: None,
            converters: None,
            environment: None,
            on_remove: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_accepting_jobs(&self) -> bool {
        self.accepting_jobs.load(Ordering::SeqCst)
    }

    pub fn activate(&self) {
        if !self.accepting_jobs.swap(true, Ordering::SeqCst) {
            tracing::info!("Printer '{}' activated", self.name);
        }
    }

    /// Stops accepting jobs. Jobs already created are unaffected.
    pub fn suspend(&self) {
        if self.accepting_jobs.swap(false, Ordering::SeqCst) {
            tracing::info!("Printer '{}' suspended", self.name);
        }
    }

    /// Asks the owner to drop this printer. The printer itself keeps working
    /// for anyone still holding it.
    pub fn remove(&self) {
        tracing::debug!("Printer '{}' requested removal", self.name);
        (self.on_remove)();
    }

    /// True exactly when a job with a document of this flavor can transfer.
    pub fn is_flavor_supported(&self, flavor: &DocFlavor) -> bool {
        self.converters.supports(flavor)
    }

    /// The well known flavors among the supported ones.
    pub fn supported_flavors(&self) -> &[DocFlavor] {
        &self.supported_flavors
    }

    /// New job writing to this printer's output. The job is tracked by the
    /// printer statistics before it is handed out.
    pub fn create_job(&self) -> Arc<PrintJob> {
        let job = Arc::new(PrintJob::new(
            self.self_ref.clone(),
            self.output.clone(),
            self.converters.clone(),
            self.environment.clone(),
        ));
        self.stats.track(&job);
        tracing::debug!("Printer '{}' created job {}", self.name, job.id());
        job
    }

    pub fn statistics(&self) -> &Arc<StatisticsCollector> {
        &self.stats
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    pub fn printer_state(&self) -> PrinterState {
        let when_idle = if self.is_accepting_jobs() {
            PrinterState::Idle
        } else {
            PrinterState::Stopped
        };
        self.stats.printer_state(when_idle)
    }

    pub fn status(&self) -> PrinterStatus {
        let stats = self.stats.snapshot();
        PrinterStatus {
            name: self.name.clone(),
            printer_state: self.printer_state(),
            accepting_jobs: self.is_accepting_jobs(),
            canceled: stats.canceled,
            completed: stats.completed,
            failed: stats.failed,
            running: stats.running,
        }
    }
}

impl fmt::Display for VirtualPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Virtual Printer : {}", self.name)
    }
}

impl fmt::Debug for VirtualPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualPrinter")
            .field("name", &self.name)
            .field("accepting_jobs", &self.is_accepting_jobs())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl PrinterManagement for VirtualPrinter {
    fn name(&self) -> &str {
        VirtualPrinter::name(self)
    }

    fn printer_state(&self) -> PrinterState {
        VirtualPrinter::printer_state(self)
    }

    fn is_accepting_jobs(&self) -> bool {
        VirtualPrinter::is_accepting_jobs(self)
    }

    fn canceled(&self) -> u64 {
        self.stats.canceled()
    }

    fn completed(&self) -> u64 {
        self.stats.completed()
    }

    fn failed(&self) -> u64 {
        self.stats.failed()
    }

    fn running(&self) -> usize {
        self.stats.running()
    }

    fn suspend(&self) {
        VirtualPrinter::suspend(self)
    }

    fn activate(&self) {
        VirtualPrinter::activate(self)
    }

    fn remove(&self) {
        VirtualPrinter::remove(self)
    }

    fn reset_statistics(&self) {
        VirtualPrinter::reset_statistics(self)
    }
}
