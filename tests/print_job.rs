use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;
use tempfile::tempdir;
use virtual_printers::document::{PageStatus, Pageable, Printable, Representation};
use virtual_printers::output::{DirectoryOutputProvider, MemoryOutputProvider, OutputTarget};
use virtual_printers::{
    Attribute, AttributeKind, AttributeSet, DocFlavor, JobEnvironment, JobEvent, JobEventKind,
    JobId, JobState, ManagementDirectory, Payload, PrintJob, PrintJobError, PrinterRegistry,
    PrinterSettings, SimpleDoc, VirtualPrinter,
};

struct Pages(Vec<&'static str>);

impl Pageable for Pages {
    fn page_count(&self) -> usize {
        self.0.len()
    }

    fn print_page(&self, page_index: usize, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "({}) show", self.0[page_index])
    }
}

fn text_doc(text: &str) -> SimpleDoc {
    SimpleDoc::new(
        DocFlavor::TEXT_PLAIN_BYTES,
        Payload::Bytes(text.as_bytes().to_vec().into()),
        None,
    )
    .unwrap()
}

fn record(job: &PrintJob) -> Arc<Mutex<Vec<JobEventKind>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    job.add_job_listener(Arc::new(move |e: &JobEvent| sink.lock().push(e.kind)));
    events
}

fn registry_with(provider: Arc<MemoryOutputProvider>) -> PrinterRegistry {
    let settings = PrinterSettings {
        output: provider,
        environment: JobEnvironment::with_user("integration"),
        ..PrinterSettings::default()
    };
    PrinterRegistry::new(settings, Arc::new(ManagementDirectory::new()))
}

#[test]
fn test_supported_document_completes() {
    let provider = Arc::new(MemoryOutputProvider::new());
    let registry = registry_with(provider.clone());
    registry.add_printer("X");
    let printer = registry.printer("X").unwrap();

    let job = printer.create_job();
    let events = record(&job);
    let request = AttributeSet::new().with(Attribute::JobName("report".into()));
    job.submit(&text_doc("quarterly numbers"), Some(&request)).unwrap();

    let stats = printer.statistics();
    assert_eq!(stats.completed(), 1);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.running(), 0);
    assert_eq!(
        *events.lock(),
        vec![
            JobEventKind::DataTransferComplete,
            JobEventKind::Completed,
            JobEventKind::NoMoreEvents
        ]
    );
    let captured = provider.output("X").unwrap().captured();
    assert_eq!(captured[0].data, b"quarterly numbers");
    assert_eq!(captured[0].mime_type, "text/plain; charset=utf-8");
}

#[test]
fn test_unsupported_document_fails() {
    let registry = registry_with(Arc::new(MemoryOutputProvider::new()));
    registry.add_printer("X");
    let printer = registry.printer("X").unwrap();

    let job = printer.create_job();
    let doc = SimpleDoc::new(
        DocFlavor::PDF_URL,
        Payload::Url("http://localhost/manual.pdf".into()),
        None,
    )
    .unwrap();
    job.submit(&doc, None).unwrap();

    assert_eq!(job.state(), JobState::Failed);
    let stats = printer.statistics().snapshot();
    assert_eq!((stats.failed, stats.completed, stats.running), (1, 0, 0));
    // the job name falls back to the document URL
    assert_eq!(job.attributes().job_name(), "http://localhost/manual.pdf");
}

#[test]
fn test_double_submit_and_double_cancel() {
    let registry = registry_with(Arc::new(MemoryOutputProvider::new()));
    registry.add_printer("X");
    let printer = registry.printer("X").unwrap();

    let job = printer.create_job();
    let events = record(&job);
    job.submit(&text_doc("once"), None).unwrap();
    assert!(matches!(
        job.submit(&text_doc("twice"), None),
        Err(PrintJobError::AlreadyPrinting(_))
    ));
    let terminal = events.lock().iter().filter(|k| k.is_terminal()).count();
    assert_eq!(terminal, 1);

    let canceled = printer.create_job();
    assert_eq!(printer.statistics().running(), 1);
    canceled.cancel();
    canceled.cancel();
    assert_eq!(printer.statistics().canceled(), 1);
    assert_eq!(printer.statistics().running(), 0);
    assert!(matches!(
        canceled.submit(&text_doc("late"), None),
        Err(PrintJobError::Canceled(_))
    ));
}

#[test]
fn test_reset_statistics_keeps_running() {
    let registry = registry_with(Arc::new(MemoryOutputProvider::new()));
    registry.add_printer("X");
    let printer = registry.printer("X").unwrap();

    printer.create_job().submit(&text_doc("a"), None).unwrap();
    let pending = printer.create_job();
    printer.reset_statistics();

    let stats = printer.statistics().snapshot();
    assert_eq!((stats.completed, stats.failed, stats.canceled), (0, 0, 0));
    assert_eq!(stats.running, 1);
    pending.cancel();
    assert_eq!(printer.statistics().running(), 0);
}

#[test]
fn test_pageable_renders_every_copy() {
    let provider = Arc::new(MemoryOutputProvider::new());
    let registry = registry_with(provider.clone());
    registry.add_printer("PS");
    let printer = registry.printer("PS").unwrap();

    let doc = SimpleDoc::new(
        DocFlavor::PAGEABLE,
        Payload::Pageable(Arc::new(Pages(vec!["one", "two"]))),
        Some(AttributeSet::new().with(Attribute::DocumentName("pages.ps".into()))),
    )
    .unwrap();
    let job = printer.create_job();
    job.submit(&doc, Some(&AttributeSet::new().with(Attribute::Copies(2))))
        .unwrap();

    assert_eq!(job.attributes().text(AttributeKind::JobName), Some("pages.ps"));
    let output = provider.output("PS").unwrap().captured();
    let text = String::from_utf8(output[0].data.clone()).unwrap();
    assert!(text.starts_with("%!PS-Adobe-3.0"));
    assert!(text.contains("%%Title: pages.ps"));
    assert!(text.contains("%%For: integration"));
    assert_eq!(text.matches("showpage").count(), 4);
    assert!(text.contains("%%Page: 4 4"));
    assert!(text.contains("%%Pages: 4"));
}

#[test]
fn test_directory_output_writes_one_file_per_job() {
    let dir = tempdir().unwrap();
    let settings = PrinterSettings {
        output: Arc::new(DirectoryOutputProvider::new(dir.path())),
        environment: JobEnvironment::with_user("integration"),
        ..PrinterSettings::default()
    };
    let registry = PrinterRegistry::new(settings, Arc::new(ManagementDirectory::new()));
    registry.add_printer("Disk");
    let printer = registry.printer("Disk").unwrap();

    let job = printer.create_job();
    job.submit(&text_doc("on disk"), None).unwrap();

    let path = dir.path().join("Disk").join(format!("{}.txt", job.id()));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "on disk");
}

struct FailingOutput {
    released: Arc<AtomicUsize>,
}

struct FailingSink {
    released: Arc<AtomicUsize>,
}

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FailingSink {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl OutputTarget for FailingOutput {
    fn open(&self, _job_id: &JobId, _mime_type: &str) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(FailingSink {
            released: self.released.clone(),
        }))
    }
}

#[test]
fn test_io_failure_is_reported_as_event_and_sink_released() {
    let released = Arc::new(AtomicUsize::new(0));
    let printer = VirtualPrinter::builder("Broken")
        .output(Arc::new(FailingOutput {
            released: released.clone(),
        }))
        .environment(JobEnvironment::with_user("integration"))
        .build();

    let job = printer.create_job();
    let events = record(&job);
    assert!(job.submit(&text_doc("lost"), None).is_ok());

    assert_eq!(job.state(), JobState::Failed);
    assert_eq!(*events.lock(), vec![JobEventKind::Failed, JobEventKind::NoMoreEvents]);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(printer.statistics().failed(), 1);
    assert_eq!(printer.statistics().running(), 0);
}

#[test]
fn test_listener_removed_before_submit_sees_nothing() {
    let printer = VirtualPrinter::builder("Quiet").build();
    let job = printer.create_job();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let listener: Arc<dyn virtual_printers::PrintJobListener> =
        Arc::new(move |_: &JobEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    job.add_job_listener(listener.clone());
    job.remove_job_listener(&listener);
    job.submit(&text_doc("x"), None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(printer.statistics().completed(), 1);
}

struct OnePage;

impl Printable for OnePage {
    fn print_page(&self, page_index: usize, out: &mut dyn Write) -> io::Result<PageStatus> {
        if page_index > 0 {
            return Ok(PageStatus::NoSuchPage);
        }
        writeln!(out, "(only) show")?;
        Ok(PageStatus::Exists)
    }
}

fn doc_for(flavor: &DocFlavor) -> SimpleDoc {
    let payload = match flavor.representation() {
        Representation::Printable => Payload::Printable(Arc::new(OnePage)),
        Representation::Pageable => Payload::Pageable(Arc::new(Pages(vec!["only"]))),
        Representation::Bytes => Payload::Bytes(b"payload".to_vec().into()),
        Representation::Url => Payload::Url("http://localhost/doc".into()),
    };
    SimpleDoc::new(flavor.clone(), payload, None).unwrap()
}

#[test]
fn test_advertised_flavors_match_transfer_outcome() {
    let registry = registry_with(Arc::new(MemoryOutputProvider::new()));
    registry.add_printer("X");
    let printer = registry.printer("X").unwrap();

    for flavor in DocFlavor::WELL_KNOWN {
        let job = printer.create_job();
        job.submit(&doc_for(&flavor), None).unwrap();
        let supported = printer.is_flavor_supported(&flavor);
        assert_eq!(supported, job.state() != JobState::Failed, "{flavor}");
        assert_eq!(supported, printer.supported_flavors().contains(&flavor), "{flavor}");
        assert_eq!(
            supported,
            !registry.lookup(Some(&flavor), None).is_empty(),
            "{flavor}"
        );
    }
}

/// Output whose first write parks until the test lets it go.
struct GatedOutput {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
    released: Arc<AtomicUsize>,
}

struct GatedSink {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
    released: Arc<AtomicUsize>,
    gated: bool,
}

impl Write for GatedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.gated {
            self.gated = true;
            self.entered.wait();
            self.release.wait();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for GatedSink {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl OutputTarget for GatedOutput {
    fn open(&self, _job_id: &JobId, _mime_type: &str) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(GatedSink {
            entered: self.entered.clone(),
            release: self.release.clone(),
            released: self.released.clone(),
            gated: false,
        }))
    }
}

#[test]
fn test_cancel_during_transfer_wins() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let released = Arc::new(AtomicUsize::new(0));
    let printer = VirtualPrinter::builder("Slow")
        .output(Arc::new(GatedOutput {
            entered: entered.clone(),
            release: release.clone(),
            released: released.clone(),
        }))
        .environment(JobEnvironment::with_user("integration"))
        .build();

    let job = printer.create_job();
    let events = record(&job);
    assert_eq!(printer.statistics().running(), 1);

    let outcome = thread::scope(|scope| {
        let submitter = scope.spawn(|| job.submit(&text_doc("slow"), None));
        entered.wait();
        assert_eq!(job.state(), JobState::Printing);
        job.cancel();
        assert_eq!(*events.lock(), vec![JobEventKind::Canceled, JobEventKind::NoMoreEvents]);
        release.wait();
        submitter.join().unwrap()
    });

    assert_eq!(outcome, Ok(()));
    assert_eq!(job.state(), JobState::Canceled);
    assert_eq!(*events.lock(), vec![JobEventKind::Canceled, JobEventKind::NoMoreEvents]);
    let stats = printer.statistics().snapshot();
    assert_eq!((stats.canceled, stats.completed, stats.failed, stats.running), (1, 0, 0, 0));
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
