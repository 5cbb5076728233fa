// spiderexpress-core/src/infrastructure/registry.rs
//
// Plug-in registries (§6, §9): connectors and strategies are resolved
// once at startup into a name-keyed map. An unresolved name is a fatal
// ConfigError, never a runtime reflection lookup on the hot path.

use crate::domain::DomainError;
use crate::ports::connector::Connector;
use crate::ports::strategy::Strategy;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.name().to_string(), connector);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Connector>, DomainError> {
        self.connectors
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::ConfigError {
                path: format!("layers.*.connector.{name}"),
                message: format!("no connector registered under the name '{name}'"),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Strategy>, DomainError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::ConfigError {
                path: format!("layers.*.sampler.{name}"),
                message: format!("no strategy registered under the name '{name}'"),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

/// Builds a registry pre-populated with the three required built-in
/// strategies (§4.4).
pub fn builtin_strategies() -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(crate::domain::strategies::RandomStrategy));
    registry.register(Arc::new(crate::domain::strategies::SnowballStrategy));
    registry.register(Arc::new(crate::domain::strategies::SpikyballStrategy));
    registry
}

/// Builds a registry pre-populated with the in-process `mock` connector
/// (§1, "a single in-process mock connector ships for demos and tests").
pub fn builtin_connectors() -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();
    registry.register(Arc::new(crate::infrastructure::connectors::mock::MockConnector::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_connector_name_is_a_config_error() {
        let registry = ConnectorRegistry::new();
        let err = registry.resolve("nope").unwrap_err();
        assert!(matches!(err, DomainError::ConfigError { .. }));
    }

    #[test]
    fn builtin_strategies_resolve_by_name() {
        let registry = builtin_strategies();
        assert!(registry.resolve("random").is_ok());
        assert!(registry.resolve("snowball").is_ok());
        assert!(registry.resolve("spikyball").is_ok());
    }

    #[test]
    fn builtin_connectors_include_mock() {
        let registry = builtin_connectors();
        assert!(registry.resolve("mock").is_ok());
        assert_eq!(registry.names(), vec!["mock"]);
    }
}
