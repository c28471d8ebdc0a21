//! Extension → analyzer dispatch.

use super::{Analyzer, Capability, PlainTextAnalyzer};
use crate::filter::normalize_extension;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Availability of one capability's parsing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityStatus {
    pub capability: Capability,
    pub available: bool,
    /// Why the capability is degraded
    pub reason: Option<String>,
    /// Configured extensions routed to the plaintext fallback
    pub fallback_extensions: Vec<String>,
}

/// Maps extensions to analyzers.
///
/// Backend availability is probed once at construction; a capability whose
/// backend is missing routes its extensions to [`PlainTextAnalyzer`].
pub struct AnalyzerRegistry {
    statuses: BTreeMap<Capability, (bool, Option<String>)>,
    overrides: HashMap<String, Arc<dyn Analyzer>>,
    fallback: Arc<dyn Analyzer>,
}

impl AnalyzerRegistry {
    /// Create a registry with every compiled-in backend available.
    pub fn new() -> Self {
        Self::with_unavailable(std::iter::empty())
    }

    /// Create a registry treating the given capabilities as unavailable.
    pub fn with_unavailable(unavailable: impl IntoIterator<Item = Capability>) -> Self {
        let disabled: HashSet<Capability> = unavailable.into_iter().collect();

        let statuses = Capability::ALL
            .iter()
            .map(|&cap| {
                let status = if cap == Capability::PlainText {
                    (true, None)
                } else if !cap.backend_compiled() {
                    (
                        false,
                        Some(format!(
                            "built without the `{}` feature",
                            cap.feature().unwrap_or_default()
                        )),
                    )
                } else if disabled.contains(&cap) {
                    (false, Some("backend disabled".to_string()))
                } else {
                    (true, None)
                };
                if let (false, Some(reason)) = &status {
                    warn!(capability = cap.name(), reason = %reason, "Analyzer capability degraded");
                }
                (cap, status)
            })
            .collect();

        Self {
            statuses,
            overrides: HashMap::new(),
            fallback: Arc::new(PlainTextAnalyzer::new()),
        }
    }

    /// Register a custom analyzer for an extension. Overrides win over defaults.
    pub fn register(&mut self, ext: &str, analyzer: Arc<dyn Analyzer>) {
        self.overrides.insert(normalize_extension(ext), analyzer);
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.statuses
            .get(&capability)
            .map(|(available, _)| *available)
            .unwrap_or(false)
    }

    /// Resolve the analyzer for an extension (leading dot and case ignored).
    pub fn analyzer_for(&self, ext: &str) -> Arc<dyn Analyzer> {
        let ext = normalize_extension(ext);
        if let Some(analyzer) = self.overrides.get(&ext) {
            return analyzer.clone();
        }

        let capability = Capability::for_extension(&ext);
        if !self.is_available(capability) {
            return self.fallback.clone();
        }

        match build(capability, &ext) {
            Some(analyzer) => analyzer,
            None => self.fallback.clone(),
        }
    }

    /// Bind one analyzer per extension.
    pub fn bind<I, S>(&self, extensions: I) -> HashMap<String, Arc<dyn Analyzer>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extensions
            .into_iter()
            .map(|ext| {
                let ext = normalize_extension(ext.as_ref());
                let analyzer = self.analyzer_for(&ext);
                debug!(ext = %ext, capability = analyzer.capability().name(), "Bound analyzer");
                (ext, analyzer)
            })
            .collect()
    }

    /// Status of every capability relative to a configured extension set.
    pub fn capability_report<I, S>(&self, extensions: I) -> Vec<CapabilityStatus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exts: Vec<String> = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        exts.sort();
        exts.dedup();

        self.statuses
            .iter()
            .map(|(&capability, (available, reason))| {
                let fallback_extensions = if *available {
                    Vec::new()
                } else {
                    exts.iter()
                        .filter(|e| !self.overrides.contains_key(*e))
                        .filter(|e| Capability::for_extension(e) == capability)
                        .cloned()
                        .collect()
                };
                CapabilityStatus {
                    capability,
                    available: *available,
                    reason: reason.clone(),
                    fallback_extensions,
                }
            })
            .collect()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate the default analyzer for an available capability.
#[cfg_attr(not(feature = "typescript"), allow(unused_variables))]
fn build(capability: Capability, ext: &str) -> Option<Arc<dyn Analyzer>> {
    match capability {
        #[cfg(feature = "python")]
        Capability::Script => Some(Arc::new(super::ScriptAnalyzer::new())),
        #[cfg(feature = "javascript")]
        Capability::WebScript => Some(Arc::new(super::WebScriptAnalyzer::new())),
        #[cfg(feature = "typescript")]
        Capability::TypedWebScript => {
            Some(Arc::new(super::TypedWebScriptAnalyzer::for_extension(ext)))
        }
        #[cfg(feature = "html")]
        Capability::Markup => Some(Arc::new(super::MarkupAnalyzer::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileSummary;
    use std::path::Path;

    struct Fixed;

    impl Analyzer for Fixed {
        fn capability(&self) -> Capability {
            Capability::PlainText
        }

        fn parse(&self, path: &Path) -> FileSummary {
            FileSummary::new(path)
        }
    }

    #[test]
    fn test_lookup_normalizes_extension() {
        let registry = AnalyzerRegistry::new();
        assert_eq!(registry.analyzer_for(".PY").capability(), registry.analyzer_for("py").capability());
        assert_eq!(
            registry.analyzer_for("unknown").capability(),
            Capability::PlainText
        );
    }

    #[cfg(feature = "python")]
    #[test]
    fn test_default_binding() {
        let registry = AnalyzerRegistry::new();
        assert_eq!(registry.analyzer_for("py").capability(), Capability::Script);
        assert!(registry.is_available(Capability::Script));
    }

    #[test]
    fn test_unavailable_capability_falls_back() {
        let registry = AnalyzerRegistry::with_unavailable([Capability::Script]);

        assert!(!registry.is_available(Capability::Script));
        assert_eq!(
            registry.analyzer_for("py").capability(),
            Capability::PlainText
        );

        let report = registry.capability_report(["py", ".pyi", "js"]);
        let script = report
            .iter()
            .find(|s| s.capability == Capability::Script)
            .unwrap();
        assert!(!script.available);
        assert!(script.reason.is_some());
        assert_eq!(script.fallback_extensions, vec!["py", "pyi"]);

        let plain = report
            .iter()
            .find(|s| s.capability == Capability::PlainText)
            .unwrap();
        assert!(plain.available);
        assert!(plain.fallback_extensions.is_empty());
    }

    #[test]
    fn test_override_takes_precedence() {
        let mut registry = AnalyzerRegistry::with_unavailable([Capability::Markup]);
        registry.register(".HTML", Arc::new(Fixed));

        let bound = registry.bind(["html", "htm"]);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound["html"].capability(), Capability::PlainText);

        // Overridden extensions are not reported as falling back
        let report = registry.capability_report(["html", "htm"]);
        let markup = report
            .iter()
            .find(|s| s.capability == Capability::Markup)
            .unwrap();
        assert_eq!(markup.fallback_extensions, vec!["htm"]);
    }

    #[test]
    fn test_bind_one_per_extension() {
        let registry = AnalyzerRegistry::new();
        let bound = registry.bind([".ts", "TSX", "ts"]);
        assert_eq!(bound.len(), 2);
        assert!(bound.contains_key("ts"));
        assert!(bound.contains_key("tsx"));
    }
}
