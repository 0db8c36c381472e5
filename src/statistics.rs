// src/statistics.rs - Per-printer job counters fed by job events
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

use crate::event::{JobEvent, JobEventKind, PrintJobListener};
use crate::print_job::PrintJob;
use crate::printer::PrinterState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub canceled: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: usize,
}

/// Counts job outcomes for one printer.
///
/// `running` goes up when a job is tracked and down on that job's
/// `NoMoreEvents`, so the matching outcome counter is always bumped first.
#[derive(Debug, Default)]
pub struct StatisticsCollector {
    canceled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    running: AtomicUsize,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `job`. Must happen before the job can be submitted.
    pub fn track(self: &Arc<Self>, job: &PrintJob) {
        self.running.fetch_add(1, Ordering::SeqCst);
        job.add_job_listener(self.clone());
    }

    pub fn canceled(&self) -> u64 {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            canceled: self.canceled(),
            completed: self.completed(),
            failed: self.failed(),
            running: self.running(),
        }
    }

    /// Clears the outcome counters. In-flight jobs keep counting in `running`.
    pub fn reset(&self) {
        self.canceled.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    /// `Processing` while any tracked job is live, `when_idle` otherwise.
    pub fn printer_state(&self, when_idle: PrinterState) -> PrinterState {
        if self.running() > 0 {
            PrinterState::Processing
        } else {
            when_idle
        }
    }
}

impl PrintJobListener for StatisticsCollector {
    fn job_event(&self, event: &JobEvent) {
        match event.kind {
            JobEventKind::Completed => {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            JobEventKind::Failed => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
            JobEventKind::Canceled => {
                self.canceled.fetch_add(1, Ordering::SeqCst);
            }
            JobEventKind::NoMoreEvents => {
                let _ = self
                    .running
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            }
            JobEventKind::DataTransferComplete | JobEventKind::RequiresAttention => {}
        }
    }
}
