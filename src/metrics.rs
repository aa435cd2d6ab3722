/// Prometheus metrics for the validation service.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;

use crate::model::{DocumentKind, MatchKind};

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for validation outcome metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ValidationLabels {
    /// Document kind ("plain_json", "rdf")
    pub kind: String,
    /// Outcome ("valid", "invalid", "no_match", "error")
    pub outcome: String,
}

/// Labels for match kind metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MatchLabels {
    /// How the resource was found (e.g. "SIMILARITY_MATCH")
    pub match_kind: String,
}

/// Labels keyed by document kind only
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct KindLabels {
    pub kind: String,
}

/// Central metrics collector with Prometheus registry
pub struct MetricsCollector {
    registry: RwLock<Registry>,

    /// Total validations by document kind and outcome
    pub validations_total: Family<ValidationLabels, Counter>,

    /// Validation latency in seconds by document kind
    pub validation_duration_seconds: Family<KindLabels, Histogram>,

    /// Total resource matches by match kind
    pub matches_total: Family<MatchLabels, Counter>,

    /// Total resources registered by document kind
    pub resources_registered_total: Family<KindLabels, Counter>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let validations_total = Family::<ValidationLabels, Counter>::default();
        registry.register(
            "dpp_validations_total",
            "Total number of validation requests",
            validations_total.clone(),
        );

        let validation_duration_seconds =
            Family::<KindLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.005, 2.5, 10))
            });
        registry.register(
            "dpp_validation_duration_seconds",
            "Validation latency histogram in seconds",
            validation_duration_seconds.clone(),
        );

        let matches_total = Family::<MatchLabels, Counter>::default();
        registry.register(
            "dpp_matches_total",
            "Total number of resource matches by match kind",
            matches_total.clone(),
        );

        let resources_registered_total = Family::<KindLabels, Counter>::default();
        registry.register(
            "dpp_resources_registered_total",
            "Total number of registered validation resources",
            resources_registered_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            validations_total,
            validation_duration_seconds,
            matches_total,
            resources_registered_total,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        encode(&mut buffer, &registry).expect("encoding metrics should succeed");
        buffer
    }

    pub fn record_validation(
        &self,
        kind: DocumentKind,
        outcome: &str,
        duration: std::time::Duration,
    ) {
        self.validations_total
            .get_or_create(&ValidationLabels {
                kind: kind.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
        self.validation_duration_seconds
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_match(&self, match_kind: MatchKind) {
        self.matches_total
            .get_or_create(&MatchLabels {
                match_kind: match_kind.to_string(),
            })
            .inc();
    }

    pub fn record_registration(&self, kind: DocumentKind) {
        self.resources_registered_total
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
