// spiderexpress-core/src/application/validation.rs
//
// Pre-flight config validation (§7, ConfigError): resolves every
// connector/sampler binding and every `dispatch_with` target against the
// registries and the declared layer set *before* the controller starts,
// so an unresolved plug-in name or layer reference is a fatal error with
// the offending path, not a panic three batches into a crawl.

use crate::domain::aggregator::AggregationFn;
use crate::domain::error::DomainError;
use crate::domain::ColumnType;
use crate::infrastructure::config::layer::single_binding;
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::registry::{ConnectorRegistry, StrategyRegistry};

pub fn validate_project(
    config: &ProjectConfig,
    connectors: &ConnectorRegistry,
    strategies: &StrategyRegistry,
) -> Result<(), DomainError> {
    if config.layers.is_empty() {
        return Err(DomainError::ConfigError {
            path: "layers".into(),
            message: "at least one layer must be declared".into(),
        });
    }

    let declared_layers: Vec<&String> = config.layers.keys().collect();

    for (layer_name, layer) in &config.layers {
        let (connector_name, _) = single_binding(&layer.connector).ok_or_else(|| {
            DomainError::ConfigError {
                path: format!("layers.{layer_name}.connector"),
                message: "exactly one connector must be bound".into(),
            }
        })?;
        connectors.resolve(connector_name)?;

        let (strategy_name, _) = single_binding(&layer.sampler).ok_or_else(|| {
            DomainError::ConfigError {
                path: format!("layers.{layer_name}.sampler"),
                message: "exactly one sampler must be bound".into(),
            }
        })?;
        strategies.resolve(strategy_name)?;

        for (column, function) in &layer.edge_agg_table.aggregations {
            if *function == AggregationFn::Count {
                continue;
            }
            let declared = layer
                .edge_raw_table
                .columns
                .get(column)
                .or_else(|| layer.edge_agg_table.columns.get(column));
            if let Some(ColumnType::Text) = declared {
                return Err(DomainError::AggregationError {
                    column: column.clone(),
                    function: format!("{function:?}").to_lowercase(),
                    reason: format!(
                        "layers.{layer_name}.edge_raw_table.columns.{column} is declared Text; only 'count' may aggregate a non-numeric column"
                    ),
                });
            }
        }

        for router in &layer.routers {
            for targetspec in &router.target {
                if let Some(dest) = &targetspec.dispatch_with {
                    if !declared_layers.iter().any(|l| l.as_str() == dest) {
                        return Err(DomainError::RouterError {
                            layer: layer_name.clone(),
                            message: format!(
                                "dispatch_with references undeclared layer '{dest}'"
                            ),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::layer::LayerConfig;
    use crate::infrastructure::registry::{builtin_connectors, builtin_strategies};
    use std::collections::HashMap;

    fn layer_with(connector: &str, sampler: &str) -> LayerConfig {
        let mut connector_map = HashMap::new();
        connector_map.insert(connector.to_string(), serde_json::json!({}));
        let mut sampler_map = HashMap::new();
        sampler_map.insert(sampler.to_string(), serde_json::json!({"sample_size": 1}));
        LayerConfig {
            connector: connector_map,
            routers: Vec::new(),
            sampler: sampler_map,
            eager: false,
            edge_raw_table: Default::default(),
            edge_agg_table: Default::default(),
            node_table: Default::default(),
        }
    }

    fn base_config() -> ProjectConfig {
        let mut layers = HashMap::new();
        layers.insert("L".to_string(), layer_with("mock", "random"));
        ProjectConfig {
            project_name: "p".into(),
            db_url: String::new(),
            db_schema: None,
            max_iteration: 1,
            batch_size: 1,
            random_wait: false,
            random_seed: None,
            empty_seeds: Default::default(),
            seeds: None,
            seed_file: None,
            layers,
        }
    }

    #[test]
    fn unresolved_connector_name_fails_validation() {
        let config = base_config();
        let connectors = ConnectorRegistry::new();
        let strategies = builtin_strategies();
        let err = validate_project(&config, &connectors, &strategies).unwrap_err();
        assert!(matches!(err, DomainError::ConfigError { .. }));
    }

    #[test]
    fn valid_config_with_builtins_passes() {
        let config = base_config();
        let connectors = builtin_connectors();
        let strategies = builtin_strategies();
        assert!(validate_project(&config, &connectors, &strategies).is_ok());
    }

    #[test]
    fn sum_on_declared_text_column_fails_validation() {
        let mut config = base_config();
        let layer = config.layers.get_mut("L").unwrap();
        layer
            .edge_raw_table
            .columns
            .insert("label".to_string(), crate::domain::ColumnType::Text);
        layer
            .edge_agg_table
            .aggregations
            .insert("label".to_string(), crate::domain::aggregator::AggregationFn::Sum);
        let connectors = builtin_connectors();
        let strategies = builtin_strategies();
        let err = validate_project(&config, &connectors, &strategies).unwrap_err();
        assert!(matches!(err, DomainError::AggregationError { .. }));
    }

    #[test]
    fn count_on_declared_text_column_passes_validation() {
        let mut config = base_config();
        let layer = config.layers.get_mut("L").unwrap();
        layer
            .edge_raw_table
            .columns
            .insert("label".to_string(), crate::domain::ColumnType::Text);
        layer
            .edge_agg_table
            .aggregations
            .insert("label".to_string(), crate::domain::aggregator::AggregationFn::Count);
        let connectors = builtin_connectors();
        let strategies = builtin_strategies();
        assert!(validate_project(&config, &connectors, &strategies).is_ok());
    }

    #[test]
    fn dispatch_with_to_undeclared_layer_fails() {
        use crate::domain::router::{RouterSpec, TargetSpec};
        let mut config = base_config();
        let layer = config.layers.get_mut("L").unwrap();
        layer.routers.push(RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "mentions".into(),
                pattern: None,
                dispatch_with: Some("Missing".into()),
            }],
            extra_raw: HashMap::new(),
        });
        let connectors = builtin_connectors();
        let strategies = builtin_strategies();
        let err = validate_project(&config, &connectors, &strategies).unwrap_err();
        assert!(matches!(err, DomainError::RouterError { .. }));
    }
}
