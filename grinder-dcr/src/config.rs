//! Configuration of the weaver.

use serde::Deserialize;

/// Weaver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// Classes whose names start with any of these prefixes are never
    /// instrumented.
    pub excluded_prefixes: Vec<String>,
    /// The maximum number of advices attached to one member.
    pub max_advices_per_call_site: usize,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: ["std::", "core::", "alloc::", "grinder_"]
                .map(String::from)
                .to_vec(),
            max_advices_per_call_site: 64,
        }
    }
}

impl WeaverConfig {
    pub(crate) fn is_excluded(&self, class_name: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }
}
