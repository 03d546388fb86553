use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use grinder_core::{
    config::InstrumentationConfig, DcrContext, Instrumenter, MasterInstrumenter, RegisteredTest,
    ServiceRegistry, Test, TestRegistry,
};
use grinder_dcr::{HostService, ScriptService, Weaver, WeaverConfig};
use grinder_telemeter::Statistics;

/// The configuration of a worker's instrumentation.
///
/// # Example
/// ```
/// # use grinder::GrinderConfig;
/// let config: GrinderConfig = toml::from_str(r#"
///     [instrumentation]
///     disabled_services = ["script"]
///
///     [weaver]
///     max_advices_per_call_site = 8
/// "#).unwrap();
///
/// assert!(config.instrumentation.dcr);
/// assert_eq!(config.weaver.max_advices_per_call_site, 8);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrinderConfig {
    /// Which mechanisms are used.
    pub instrumentation: InstrumentationConfig,
    /// Limits and exclusions of the weaver.
    pub weaver: WeaverConfig,
}

/// Services shipped with grinder, in priority order.
pub fn default_services() -> ServiceRegistry {
    ServiceRegistry::new()
        .register(ScriptService)
        .register(HostService)
}

/// Everything a worker needs to record its tests.
pub struct Instrumentation {
    weaver: Option<Arc<Weaver>>,
    master: Arc<MasterInstrumenter>,
    statistics: Arc<Statistics>,
    tests: TestRegistry,
}

impl Instrumentation {
    /// Builds instrumentation provided by [`default_services`].
    pub fn new(config: &GrinderConfig) -> Self {
        Self::with_services(config, &default_services())
    }

    /// Builds instrumentation provided by `services`.
    ///
    /// The weaver is created only if DCR is enabled.
    pub fn with_services(config: &GrinderConfig, services: &ServiceRegistry) -> Self {
        let weaver = config
            .instrumentation
            .dcr
            .then(|| Arc::new(Weaver::new(config.weaver.clone())));
        let dcr = weaver.clone().map(|w| w as Arc<dyn DcrContext>);

        let master = Arc::new(services.master_instrumenter(dcr.as_ref(), &config.instrumentation));
        let statistics = Arc::new(Statistics::new());
        let tests = TestRegistry::new(master.clone(), statistics.clone());

        Self {
            weaver,
            master,
            statistics,
            tests,
        }
    }

    /// The weaving engine, `None` if DCR is disabled.
    pub fn weaver(&self) -> Option<&Arc<Weaver>> {
        self.weaver.as_ref()
    }

    /// The instrumenter every registered test uses.
    pub fn instrumenter(&self) -> &MasterInstrumenter {
        &self.master
    }

    /// Per-test totals.
    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    /// Registered tests.
    pub fn tests(&self) -> &TestRegistry {
        &self.tests
    }

    /// Shortcut for `tests().register(test)`.
    pub fn register(&self, test: &Test) -> RegisteredTest {
        self.tests.register(test)
    }

    /// Marks the end of initialisation: from now on no target can be
    /// recorded, already recorded ones keep being measured.
    pub fn start(&self) {
        if let Some(weaver) = &self.weaver {
            weaver.seal();
        }

        info!(
            tests = self.tests.tests().len(),
            mechanisms = self.master.description().as_deref().unwrap_or("none"),
            "instrumentation is started"
        );
    }
}
