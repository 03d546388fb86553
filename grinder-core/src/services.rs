//! Discovery of instrumenters provided by script engines.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::InstrumentationConfig,
    dcr::DcrContext,
    instrumenter::{Instrumenter, MasterInstrumenter},
};

/// A script engine plugin contributing instrumenters.
pub trait ScriptEngineService: Send + Sync {
    /// A short unique name, used to disable the service in config.
    fn name(&self) -> &str;

    /// Creates instrumenters for this engine.
    ///
    /// `dcr` is `None` if dynamic code rewriting isn't available (or is
    /// disabled), in which case the service provides whatever works without it.
    fn create_instrumenters(&self, dcr: Option<&Arc<dyn DcrContext>>) -> Vec<Arc<dyn Instrumenter>>;
}

/// An ordered list of services. Registration order is priority.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Box<dyn ScriptEngineService>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service with lower priority than already registered ones.
    pub fn register(mut self, service: impl ScriptEngineService + 'static) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Names of registered services in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name())
    }

    /// Collects instrumenters of all enabled services in priority order.
    pub fn instrumenters(
        &self,
        dcr: Option<&Arc<dyn DcrContext>>,
        config: &InstrumentationConfig,
    ) -> Vec<Arc<dyn Instrumenter>> {
        let dcr = dcr.filter(|_| config.dcr);

        let mut instrumenters = Vec::new();
        for service in &self.services {
            if !config.is_enabled(service.name()) {
                debug!(service = service.name(), "service is disabled");
                continue;
            }

            let provided = service.create_instrumenters(dcr);
            debug!(
                service = service.name(),
                dcr = dcr.is_some(),
                count = provided.len(),
                "service provided instrumenters"
            );
            instrumenters.extend(provided);
        }

        instrumenters
    }

    /// Builds the instrumenter used by tests.
    pub fn master_instrumenter(
        &self,
        dcr: Option<&Arc<dyn DcrContext>>,
        config: &InstrumentationConfig,
    ) -> MasterInstrumenter {
        let master = MasterInstrumenter::new(self.instrumenters(dcr, config));

        match master.description() {
            Some(description) => info!(mechanisms = %description, "instrumentation is ready"),
            None => warn!("no instrumenter is available, tests can't record targets"),
        }

        master
    }
}
