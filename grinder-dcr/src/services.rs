use std::sync::Arc;

use tracing::debug;

use grinder_core::{DcrContext, DcrInstrumenter, Instrumenter, ScriptEngineService};

use crate::{host::HostStager, script::ScriptStager};

/// Provides the [`HostStager`] instrumenter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostService;

impl ScriptEngineService for HostService {
    fn name(&self) -> &str {
        "host"
    }

    fn create_instrumenters(
        &self,
        dcr: Option<&Arc<dyn DcrContext>>,
    ) -> Vec<Arc<dyn Instrumenter>> {
        match dcr {
            Some(context) => {
                vec![Arc::new(DcrInstrumenter::new(context.clone(), HostStager)) as _]
            }
            None => {
                debug!(service = self.name(), "no DCR context, nothing to provide");
                Vec::new()
            }
        }
    }
}

/// Provides the [`ScriptStager`] instrumenter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptService;

impl ScriptEngineService for ScriptService {
    fn name(&self) -> &str {
        "script"
    }

    fn create_instrumenters(
        &self,
        dcr: Option<&Arc<dyn DcrContext>>,
    ) -> Vec<Arc<dyn Instrumenter>> {
        match dcr {
            Some(context) => {
                vec![Arc::new(DcrInstrumenter::new(context.clone(), ScriptStager)) as _]
            }
            None => {
                debug!(service = self.name(), "no DCR context, nothing to provide");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use grinder_test::RecordingDcrContext;

    use super::*;

    #[test]
    fn instrumenters_require_dcr() {
        let context: Arc<dyn DcrContext> = Arc::new(RecordingDcrContext::default());

        assert!(HostService.create_instrumenters(None).is_empty());
        assert!(ScriptService.create_instrumenters(None).is_empty());

        let host = HostService.create_instrumenters(Some(&context));
        assert_eq!(host.len(), 1);
        assert_eq!(
            host[0].description().as_deref(),
            Some("host DCR instrumenter")
        );

        let script = ScriptService.create_instrumenters(Some(&context));
        assert_eq!(
            script[0].description().as_deref(),
            Some("script DCR instrumenter")
        );
    }
}
