// src/event.rs - Job lifecycle events and synchronous listener fan-out
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::attributes::AttributeSet;
use crate::print_job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobEventKind {
    DataTransferComplete,
    Completed,
    Failed,
    Canceled,
    RequiresAttention,
    NoMoreEvents,
}

impl JobEventKind {
    /// Completed, failed and canceled end a job; exactly one of them is
    /// delivered per job, followed by `NoMoreEvents`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEventKind::Completed | JobEventKind::Failed | JobEventKind::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: JobEventKind,
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.kind, self.job_id)
    }
}

pub trait PrintJobListener: Send + Sync {
    fn job_event(&self, event: &JobEvent);
}

impl<F> PrintJobListener for F
where
    F: Fn(&JobEvent) + Send + Sync,
{
    fn job_event(&self, event: &JobEvent) {
        self(event)
    }
}

/// Receives attribute changes of a job. Job attributes are fixed once a job
/// is submitted, so registrations are bookkeeping only.
pub trait PrintJobAttributeListener: Send + Sync {
    fn attributes_updated(&self, job_id: &JobId, changed: &AttributeSet);
}

struct AttributeRegistration {
    listener: Arc<dyn PrintJobAttributeListener>,
    filter: Option<AttributeSet>,
}

impl AttributeRegistration {
    fn wants(&self, changed: &AttributeSet) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => changed.iter().any(|a| filter.contains(a.kind())),
        }
    }
}

/// Listener lists of one job.
///
/// Dispatch runs on the caller's thread against a snapshot taken at the start
/// of the call, so listeners may register or unregister concurrently (or from
/// inside a callback) without affecting the event in flight.
#[derive(Default)]
pub struct EventNotifier {
    job_listeners: RwLock<Vec<Arc<dyn PrintJobListener>>>,
    attribute_listeners: RwLock<Vec<AttributeRegistration>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_job_listener(&self, listener: Arc<dyn PrintJobListener>) {
        self.job_listeners.write().push(listener);
    }

    /// Removes one registration of `listener`; unknown listeners are ignored.
    pub fn remove_job_listener(&self, listener: &Arc<dyn PrintJobListener>) -> bool {
        let mut listeners = self.job_listeners.write();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn add_attribute_listener(
        &self,
        listener: Arc<dyn PrintJobAttributeListener>,
        filter: Option<AttributeSet>,
    ) {
        self.attribute_listeners
            .write()
            .push(AttributeRegistration { listener, filter });
    }

    pub fn remove_attribute_listener(&self, listener: &Arc<dyn PrintJobAttributeListener>) -> bool {
        let mut registrations = self.attribute_listeners.write();
        match registrations
            .iter()
            .position(|r| same_listener(&r.listener, listener))
        {
            Some(index) => {
                registrations.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn job_listener_count(&self) -> usize {
        self.job_listeners.read().len()
    }

    pub fn attribute_listener_count(&self) -> usize {
        self.attribute_listeners.read().len()
    }

    pub fn notify(&self, event: &JobEvent) {
        let snapshot = self.job_listeners.read().clone();
        tracing::debug!("Dispatching {} to {} listeners", event, snapshot.len());
        for listener in snapshot {
            listener.job_event(event);
        }
    }

    /// Delivers an attribute change to every registration whose filter is
    /// empty or shares a kind with `changed`.
    pub fn notify_attributes(&self, job_id: &JobId, changed: &AttributeSet) {
        let targets: Vec<_> = self
            .attribute_listeners
            .read()
            .iter()
            .filter(|r| r.wants(changed))
            .map(|r| r.listener.clone())
            .collect();
        for listener in targets {
            listener.attributes_updated(job_id, changed);
        }
    }
}

// Compares the data pointer only; vtable pointers of the same type may differ
// between codegen units.
fn same_listener<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
