//! Management surface of virtual printers.
//!
//! [`PrinterManagement`] is what a remote operator can see and do for one
//! printer. A [`ManagementExposer`] publishes those handles under the printer
//! name; the transport that reaches them (HTTP, RPC, ...) lives elsewhere.
//! [`ManagementDirectory`] is the in-process exposer the HTTP API uses.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::printer::PrinterState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManagementError {
    #[error("Management handle '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Management handle '{0}' is not registered")]
    NotRegistered(String),
}

pub trait PrinterManagement: Send + Sync {
    fn name(&self) -> &str;
    fn printer_state(&self) -> PrinterState;
    fn is_accepting_jobs(&self) -> bool;
    fn canceled(&self) -> u64;
    fn completed(&self) -> u64;
    fn failed(&self) -> u64;
    fn running(&self) -> usize;
    /// Stops accepting jobs.
    fn suspend(&self);
    /// Starts accepting jobs again.
    fn activate(&self);
    /// Removes the printer from whatever owns it.
    fn remove(&self);
    /// Zeroes completed, failed and canceled.
    fn reset_statistics(&self);
}

/// Publishes management handles by name.
///
/// The registry calls both methods while holding its write lock, so an
/// implementation must not call back into the registry.
pub trait ManagementExposer: Send + Sync {
    fn register(&self, name: &str, handle: Arc<dyn PrinterManagement>) -> Result<(), ManagementError>;
    fn unregister(&self, name: &str) -> Result<(), ManagementError>;
}

#[derive(Default)]
pub struct ManagementDirectory {
    handles: RwLock<BTreeMap<String, Arc<dyn PrinterManagement>>>,
}

impl ManagementDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn PrinterManagement>> {
        self.handles.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.handles.read().keys().cloned().collect()
    }
}

impl ManagementExposer for ManagementDirectory {
    fn register(&self, name: &str, handle: Arc<dyn PrinterManagement>) -> Result<(), ManagementError> {
        let mut handles = self.handles.write();
        if handles.contains_key(name) {
            return Err(ManagementError::AlreadyRegistered(name.to_string()));
        }
        handles.insert(name.to_string(), handle);
        Ok(())
    }

    fn unregister(&self, name: &str) -> Result<(), ManagementError> {
        self.handles
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ManagementError::NotRegistered(name.to_string()))
    }
}
