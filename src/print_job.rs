// src/print_job.rs - Single-submission print job state machine
use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::attributes::{merge_job_attributes, AttributeSet, JobAttributes, JobEnvironment};
use crate::convert::{ConverterRegistry, TransferError};
use crate::document::Document;
use crate::event::{
    EventNotifier, JobEvent, JobEventKind, PrintJobAttributeListener, PrintJobListener,
};
use crate::output::OutputTarget;
use crate::printer::VirtualPrinter;

/// Precondition failures reported synchronously by [`PrintJob::submit`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrintJobError {
    #[error("Print job {0} is already printing")]
    AlreadyPrinting(JobId),
    #[error("Print job {0} has been canceled")]
    Canceled(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Printing,
    Completed,
    Failed,
    Canceled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Canceled)
    }
}

/// One print submission.
///
/// A job accepts a single [`submit`](PrintJob::submit). Whatever the outcome,
/// listeners see exactly one of completed, failed or canceled followed by one
/// no-more-events notification. Transfer failures never surface as errors from
/// `submit`; callers learn about them through events or [`PrintJob::state`].
pub struct PrintJob {
    id: JobId,
    created_at: DateTime<Utc>,
    printer: Weak<VirtualPrinter>,
    state: Mutex<JobState>,
    attributes: OnceLock<JobAttributes>,
    notifier: EventNotifier,
    output: Arc<dyn OutputTarget>,
    converters: Arc<ConverterRegistry>,
    environment: JobEnvironment,
}

impl PrintJob {
    pub fn new(
        printer: Weak<VirtualPrinter>,
        output: Arc<dyn OutputTarget>,
        converters: Arc<ConverterRegistry>,
        environment: JobEnvironment,
    ) -> Self {
        Self {
            id: JobId::new(),
            created_at: Utc::now(),
            printer,
            state: Mutex::new(JobState::Idle),
            attributes: OnceLock::new(),
            notifier: EventNotifier::new(),
            output,
            converters,
            environment,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The printer this job was created by, if it still exists.
    pub fn printer(&self) -> Option<Arc<VirtualPrinter>> {
        self.printer.upgrade()
    }

    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    /// Empty until the job is submitted, then the merged attribute set.
    pub fn attributes(&self) -> JobAttributes {
        self.attributes.get().cloned().unwrap_or_default()
    }

    pub fn add_job_listener(&self, listener: Arc<dyn PrintJobListener>) {
        self.notifier.add_job_listener(listener);
    }

    pub fn remove_job_listener(&self, listener: &Arc<dyn PrintJobListener>) {
        self.notifier.remove_job_listener(listener);
    }

    pub fn add_attribute_listener(
        &self,
        listener: Arc<dyn PrintJobAttributeListener>,
        filter: Option<AttributeSet>,
    ) {
        self.notifier.add_attribute_listener(listener, filter);
    }

    pub fn remove_attribute_listener(&self, listener: &Arc<dyn PrintJobAttributeListener>) {
        self.notifier.remove_attribute_listener(listener);
    }

    /// Prints `document` to this job's output.
    ///
    /// Fails only when the job was canceled or already submitted; in that case
    /// nothing is emitted.
    pub fn submit(
        &self,
        document: &dyn Document,
        request: Option<&AttributeSet>,
    ) -> Result<(), PrintJobError> {
        let attributes = JobAttributes::from(merge_job_attributes(
            document,
            request,
            &self.environment,
        ));
        {
            // attributes are published before anyone can observe Printing
            let mut state = self.state.lock();
            match *state {
                JobState::Idle => {
                    let _ = self.attributes.set(attributes.clone());
                    *state = JobState::Printing;
                }
                JobState::Canceled => return Err(PrintJobError::Canceled(self.id.clone())),
                _ => return Err(PrintJobError::AlreadyPrinting(self.id.clone())),
            }
        }
        tracing::info!(
            "Printing job {} '{}' ({})",
            self.id,
            attributes.job_name(),
            document.flavor()
        );

        match self.transfer(document, &attributes) {
            Ok(()) => {
                self.finish(JobState::Completed);
            }
            Err(TransferError::UnsupportedFormat(flavor)) => {
                tracing::warn!("Job {} failed: no converter for {}", self.id, flavor);
                self.finish(JobState::Failed);
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", self.id, e);
                self.finish(JobState::Failed);
            }
        }
        Ok(())
    }

    /// Marks the job canceled. Only the first call on a non-terminal job has
    /// an effect. A transfer already in progress runs to its end but its
    /// outcome is no longer reported.
    pub fn cancel(&self) {
        if self.finish(JobState::Canceled) {
            tracing::info!("Job {} canceled", self.id);
        }
    }

    fn transfer(&self, document: &dyn Document, attributes: &JobAttributes) -> Result<(), TransferError> {
        let converter = self
            .converters
            .lookup(document.flavor())
            .ok_or_else(|| TransferError::UnsupportedFormat(document.flavor().clone()))?;
        let mime_type = converter.output_mime_type(document.flavor());
        let mut sink = self.output.open(&self.id, &mime_type)?;
        converter.convert(document, attributes, &mut *sink)?;
        sink.flush()?;
        Ok(())
    }

    // Moves a live job to `terminal` and emits the terminal event followed by
    // NoMoreEvents (a completed job announces the finished transfer first).
    // Returns false when the job had already ended.
    fn finish(&self, terminal: JobState) -> bool {
        {
            let mut state = self.state.lock();
            if state.is_terminal() {
                return false;
            }
            *state = terminal;
        }
        let kind = match terminal {
            JobState::Completed => {
                self.notify(JobEventKind::DataTransferComplete);
                JobEventKind::Completed
            }
            JobState::Failed => JobEventKind::Failed,
            _ => JobEventKind::Canceled,
        };
        self.notify(kind);
        self.notify(JobEventKind::NoMoreEvents);
        true
    }

    fn notify(&self, kind: JobEventKind) {
        self.notifier.notify(&JobEvent {
            job_id: self.id.clone(),
            kind,
        });
    }
}

impl fmt::Debug for PrintJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintJob")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, AttributeKind, DEFAULT_JOB_NAME};
    use crate::document::{DocFlavor, Payload, SimpleDoc};
    use crate::output::MemoryOutput;

    fn job(output: &MemoryOutput) -> PrintJob {
        PrintJob::new(
            Weak::new(),
            Arc::new(output.clone()),
            Arc::new(ConverterRegistry::default()),
            JobEnvironment::with_user("tester"),
        )
    }

    fn text_doc() -> SimpleDoc {
        SimpleDoc::new(
            DocFlavor::TEXT_PLAIN_BYTES,
            Payload::Bytes(b"hello printer".to_vec().into()),
            None,
        )
        .unwrap()
    }

    fn recorder(job: &PrintJob) -> Arc<Mutex<Vec<JobEventKind>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        job.add_job_listener(Arc::new(move |e: &JobEvent| sink.lock().push(e.kind)));
        events
    }

    #[test]
    fn test_attributes_empty_before_submit() {
        let output = MemoryOutput::new();
        let job = job(&output);
        assert!(job.attributes().is_empty());
        assert_eq!(job.state(), JobState::Idle);
        assert!(job.printer().is_none());
    }

    #[test]
    fn test_submit_completes() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let events = recorder(&job);
        let request = AttributeSet::new().with(Attribute::JobName("greeting".into()));

        job.submit(&text_doc(), Some(&request)).unwrap();

        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(
            *events.lock(),
            vec![
                JobEventKind::DataTransferComplete,
                JobEventKind::Completed,
                JobEventKind::NoMoreEvents
            ]
        );
        assert_eq!(job.attributes().text(AttributeKind::JobName), Some("greeting"));
        assert_eq!(job.attributes().originating_user(), "tester");
        let captured = output.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].data, b"hello printer");
        assert_eq!(&captured[0].job_id, job.id());
    }

    #[test]
    fn test_second_submit_rejected() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let events = recorder(&job);
        job.submit(&text_doc(), None).unwrap();
        let err = job.submit(&text_doc(), None).unwrap_err();
        assert_eq!(err, PrintJobError::AlreadyPrinting(job.id().clone()));
        assert_eq!(events.lock().len(), 3);
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent_and_blocks_submit() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let events = recorder(&job);
        job.cancel();
        job.cancel();
        assert_eq!(
            *events.lock(),
            vec![JobEventKind::Canceled, JobEventKind::NoMoreEvents]
        );
        assert_eq!(
            job.submit(&text_doc(), None),
            Err(PrintJobError::Canceled(job.id().clone()))
        );
        assert!(job.attributes().is_empty());
        assert!(output.is_empty());
    }

    #[test]
    fn test_attributes_visible_once_printing() {
        let output = MemoryOutput::new();
        for _ in 0..20 {
            let job = job(&output);
            std::thread::scope(|scope| {
                let observer = scope.spawn(|| loop {
                    let state = job.state();
                    if state != JobState::Idle {
                        assert!(!job.attributes().is_empty(), "no attributes in state {state:?}");
                        break;
                    }
                    std::thread::yield_now();
                });
                job.submit(&text_doc(), None).unwrap();
                observer.join().unwrap();
            });
            assert_eq!(job.attributes().job_name(), DEFAULT_JOB_NAME);
        }
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let events = recorder(&job);
        job.submit(&text_doc(), None).unwrap();
        job.cancel();
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(events.lock().len(), 3);
    }

    #[test]
    fn test_unsupported_flavor_fails_without_error() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let events = recorder(&job);
        let doc = SimpleDoc::new(DocFlavor::PDF_URL, Payload::Url("http://localhost/a.pdf".into()), None).unwrap();
        assert!(job.submit(&doc, None).is_ok());
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(*events.lock(), vec![JobEventKind::Failed, JobEventKind::NoMoreEvents]);
        assert!(output.is_empty());
    }

    #[test]
    fn test_listener_removal_tolerates_unknown() {
        let output = MemoryOutput::new();
        let job = job(&output);
        let listener: Arc<dyn PrintJobListener> = Arc::new(|_: &JobEvent| {});
        job.remove_job_listener(&listener);
        job.add_job_listener(listener.clone());
        job.add_job_listener(listener.clone());
        job.remove_job_listener(&listener);
        job.remove_job_listener(&listener);
        job.remove_job_listener(&listener);
        assert_eq!(job.notifier.job_listener_count(), 0);
    }
}
