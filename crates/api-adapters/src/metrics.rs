//! Prometheus counters for rule-engine outcomes.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use domains::DomainError;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub operation: String,
    /// `ok` or the error kind.
    pub outcome: String,
}

pub struct Metrics {
    registry: Registry,
    outcomes: Family<OutcomeLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let outcomes = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "talkboard_rule_outcomes",
            "Rule-engine operations by outcome",
            outcomes.clone(),
        );
        Self { registry, outcomes }
    }

    pub fn observe(&self, operation: &str, error: Option<&DomainError>) {
        let outcome = error.map_or("ok", DomainError::kind);
        self.outcomes
            .get_or_create(&OutcomeLabels {
                operation: operation.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Current value for one series; reading never creates the series.
    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.outcomes
            .get(&OutcomeLabels {
                operation: operation.to_string(),
                outcome: outcome.to_string(),
            })
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
