//! Process-wide readiness registry for optional parsing/rendering capabilities.
//!
//! PDF and DOCX extraction are compiled in behind the `pdf` / `docx` cargo features and
//! can additionally be switched off in `config.yaml`; the concept-map renderer needs a
//! script location to reference. The registry is initialised exactly once at startup
//! from that information and is read-only afterwards. Consumers ask
//! [`CapabilityRegistry::is_available`] before touching a capability and fail fast
//! when it answers `false`. Nothing waits or retries.

use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::fmt;

use crate::config::RepasoConfig;

/// An optional capability the application may or may not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PdfText,
    DocxText,
    GraphRenderer,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::PdfText => "La extracción de texto PDF",
            Capability::DocxText => "La extracción de texto DOCX",
            Capability::GraphRenderer => "El visor de mapas conceptuales",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyInitialized;

/// Init-once set of available capabilities.
///
/// Before [`init`](Self::init) runs, every capability reports as unavailable.
pub struct CapabilityRegistry {
    ready: OnceCell<HashSet<Capability>>,
}

/// The registry used by the binary.
pub static CAPABILITIES: CapabilityRegistry = CapabilityRegistry::new();

impl CapabilityRegistry {
    pub const fn new() -> Self {
        Self {
            ready: OnceCell::new(),
        }
    }

    /// Records which capabilities are available. Only the first call has any effect.
    pub fn init(
        &self,
        available: impl IntoIterator<Item = Capability>,
    ) -> Result<(), AlreadyInitialized> {
        let set: HashSet<Capability> = available.into_iter().collect();
        tracing::info!("Capabilities ready: {:?}", set);
        self.ready.set(set).map_err(|_| AlreadyInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.ready
            .get()
            .map(|set| set.contains(&capability))
            .unwrap_or(false)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Works out which capabilities this build and configuration provide.
pub fn probe(config: &RepasoConfig) -> Vec<Capability> {
    let mut found = Vec::new();
    if cfg!(feature = "pdf") && config.capabilities.pdf {
        found.push(Capability::PdfText);
    }
    if cfg!(feature = "docx") && config.capabilities.docx {
        found.push(Capability::DocxText);
    }
    if config.capabilities.graph && !config.graph_script_url.trim().is_empty() {
        found.push(Capability::GraphRenderer);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_registry_reports_nothing() {
        let registry = CapabilityRegistry::new();
        assert!(!registry.is_initialized());
        assert!(!registry.is_available(Capability::PdfText));
        assert!(!registry.is_available(Capability::GraphRenderer));
    }

    #[test]
    fn test_init_only_once() {
        let registry = CapabilityRegistry::new();
        assert!(registry.init([Capability::DocxText]).is_ok());
        assert_eq!(
            registry.init([Capability::PdfText]),
            Err(AlreadyInitialized)
        );
        assert!(registry.is_available(Capability::DocxText));
        assert!(!registry.is_available(Capability::PdfText));
    }

    #[test]
    fn test_probe_respects_toggles() {
        let mut config = RepasoConfig::default();
        config.capabilities.graph = false;
        config.capabilities.pdf = false;
        let found = probe(&config);
        assert!(!found.contains(&Capability::GraphRenderer));
        assert!(!found.contains(&Capability::PdfText));

        config.capabilities.graph = true;
        config.graph_script_url = "   ".to_string();
        assert!(!probe(&config).contains(&Capability::GraphRenderer));
    }
}
