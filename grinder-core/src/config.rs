//! Configuration of instrumentation.

use serde::Deserialize;

/// Selects the instrumentation mechanisms of a worker.
///
/// # Example
/// ```
/// # use grinder_core::config::InstrumentationConfig;
/// let config: InstrumentationConfig = toml::from_str(r#"
///     dcr = false
///     disabled_services = ["script"]
/// "#).unwrap();
///
/// assert!(!config.dcr);
/// assert!(!config.is_enabled("script"));
/// assert!(config.is_enabled("host"));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Use dynamic code rewriting if the worker supports it.
    pub dcr: bool,
    /// Names of script engine services that must not provide instrumenters.
    pub disabled_services: Vec<String>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            dcr: true,
            disabled_services: Vec::new(),
        }
    }
}

impl InstrumentationConfig {
    /// Returns whether the service named `service` may provide instrumenters.
    pub fn is_enabled(&self, service: &str) -> bool {
        !self.disabled_services.iter().any(|s| s == service)
    }
}
