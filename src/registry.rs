// src/registry.rs - Named collection of virtual printers with a default
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::attributes::JobEnvironment;
use crate::convert::ConverterRegistry;
use crate::document::DocFlavor;
use crate::management::{ManagementDirectory, ManagementExposer};
use crate::output::{MemoryOutputProvider, OutputProvider};
use crate::printer::VirtualPrinter;

/// Name of the printer created when no other printer is configured.
pub const FALLBACK_PRINTER_NAME: &str = "VirtualPrinter";

/// What every printer of a registry is built with.
#[derive(Clone)]
pub struct PrinterSettings {
    pub output: Arc<dyn OutputProvider>,
    pub converters: Arc<ConverterRegistry>,
    pub environment: JobEnvironment,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            output: Arc::new(MemoryOutputProvider::new()),
            converters: Arc::new(ConverterRegistry::default()),
            environment: JobEnvironment::from_system(),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    printers: Vec<Arc<VirtualPrinter>>,
    default_name: Option<String>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    settings: PrinterSettings,
    exposer: Arc<dyn ManagementExposer>,
}

impl RegistryInner {
    // The exposer is called under the write lock so the management mirror
    // changes in the same order as the printer list. Printer callbacks are
    // never invoked under it, so a printer removing itself cannot deadlock.
    fn remove_printer(&self, name: &str) -> bool {
        let mut state = self.state.write();
        if state.default_name.as_deref() == Some(name) {
            state.default_name = None;
        }
        let Some(index) = state.printers.iter().position(|p| p.name() == name) else {
            return false;
        };
        state.printers.remove(index);
        if let Err(e) = self.exposer.unregister(name) {
            tracing::error!("Unable to unregister management handle: {}", e);
        }
        drop(state);
        tracing::info!("Removed printer: {}", name);
        true
    }
}

/// Thread safe printer registry. Clones share the same printers.
///
/// Readers get snapshots, so iterating a printer list while printers are added
/// or removed elsewhere is fine.
#[derive(Clone)]
pub struct PrinterRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for PrinterRegistry {
    fn default() -> Self {
        Self::new(PrinterSettings::default(), Arc::new(ManagementDirectory::new()))
    }
}

impl PrinterRegistry {
    pub fn new(settings: PrinterSettings, exposer: Arc<dyn ManagementExposer>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                settings,
                exposer,
            }),
        }
    }

    /// Adds every name in order, falling back to [`FALLBACK_PRINTER_NAME`] when
    /// that leaves the registry empty, then applies `default_printer`.
    pub fn initialize<I, S>(&self, names: I, default_printer: Option<&str>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add_printer(name.as_ref());
        }
        if self.is_empty() {
            self.add_printer(FALLBACK_PRINTER_NAME);
        }
        if let Some(name) = default_printer {
            if !self.set_default_printer_name(name) {
                tracing::warn!("Default printer '{}' is not a configured printer", name);
            }
        }
    }

    /// Returns false when a printer with that name already exists.
    pub fn add_printer(&self, name: &str) -> bool {
        if name.is_empty() {
            tracing::warn!("Ignoring printer with empty name");
            return false;
        }
        let mut state = self.inner.state.write();
        if state.printers.iter().any(|p| p.name() == name) {
            return false;
        }
        let registry = Arc::downgrade(&self.inner);
        let removal_name = name.to_string();
        let printer = VirtualPrinter::builder(name)
            .output(self.inner.settings.output.output_for(name))
            .converters(self.inner.settings.converters.clone())
            .environment(self.inner.settings.environment.clone())
            .on_remove(move || remove_from(&registry, &removal_name))
            .build();
        state.printers.push(printer.clone());
        if let Err(e) = self.inner.exposer.register(name, printer) {
            tracing::error!("Unable to register management handle: {}", e);
        }
        drop(state);
        tracing::info!("Adding printer: {}", name);
        true
    }

    /// Returns false when no printer has that name. Clears the default if it
    /// pointed at the removed printer.
    pub fn remove_printer(&self, name: &str) -> bool {
        self.inner.remove_printer(name)
    }

    /// Accepted only for a name that currently resolves to a printer.
    pub fn set_default_printer_name(&self, name: &str) -> bool {
        let mut state = self.inner.state.write();
        if state.printers.iter().any(|p| p.name() == name) {
            state.default_name = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn default_printer_name(&self) -> Option<String> {
        self.inner.state.read().default_name.clone()
    }

    pub fn default_printer(&self) -> Option<Arc<VirtualPrinter>> {
        let state = self.inner.state.read();
        let name = state.default_name.as_deref()?;
        state.printers.iter().find(|p| p.name() == name).cloned()
    }

    /// The default printer, or the first one added.
    pub fn preferred_printer(&self) -> Option<Arc<VirtualPrinter>> {
        self.default_printer()
            .or_else(|| self.inner.state.read().printers.first().cloned())
    }

    pub fn printers(&self) -> Vec<Arc<VirtualPrinter>> {
        self.inner.state.read().printers.clone()
    }

    pub fn printer(&self, name: &str) -> Option<Arc<VirtualPrinter>> {
        self.inner
            .state
            .read()
            .printers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    pub fn printer_names(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .printers
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Printers supporting `flavor` and named `name`; `None` matches anything.
    pub fn lookup(&self, flavor: Option<&DocFlavor>, name: Option<&str>) -> Vec<Arc<VirtualPrinter>> {
        self.inner
            .state
            .read()
            .printers
            .iter()
            .filter(|p| flavor.is_none_or(|f| p.is_flavor_supported(f)))
            .filter(|p| name.is_none_or(|n| p.name() == n))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().printers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().printers.is_empty()
    }
}

fn remove_from(registry: &Weak<RegistryInner>, name: &str) {
    if let Some(inner) = registry.upgrade() {
        inner.remove_printer(name);
    }
}
