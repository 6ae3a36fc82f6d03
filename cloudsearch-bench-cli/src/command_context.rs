use std::collections::HashMap;

use anyhow::Context;
use config::builder::DefaultState;
use config::{ConfigBuilder, Map, Source, Value, ValueKind};
use slog::{Logger, debug};

use cloudsearch_bench::{
    CloudSearchConfiguration, CloudSearchRecordStore, ConfigParameters,
    ElasticsearchConfiguration, ElasticsearchRecordStore, RecordStore, StdResult,
};

/// Document service targeted by the record commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Amazon CloudSearch domain
    #[value(name = "cloudsearch")]
    CloudSearch,
    /// Elasticsearch cluster
    #[value(name = "elasticsearch")]
    Elasticsearch,
}

/// Context for the command execution
pub struct CommandContext {
    config_builder: ConfigBuilder<DefaultState>,
    backend: Backend,
    logger: Logger,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(
        config_builder: ConfigBuilder<DefaultState>,
        backend: Backend,
        logger: Logger,
    ) -> Self {
        Self {
            config_builder,
            backend,
            logger,
        }
    }

    /// Get the configured parameters, nested keys are flattened with a `.` separator
    pub fn config_parameters(&self) -> StdResult<ConfigParameters> {
        let config = self.config_builder.clone().build()?;
        let mut parameters = HashMap::new();
        flatten_into("", config.collect()?, &mut parameters)?;

        Ok(ConfigParameters::new(parameters))
    }

    /// Create the record store of the selected backend
    pub async fn record_store(&self) -> StdResult<Box<dyn RecordStore>> {
        let parameters = self.config_parameters()?;
        debug!(self.logger, "Creating record store"; "backend" => ?self.backend);

        let store: Box<dyn RecordStore> = match self.backend {
            Backend::CloudSearch => {
                let configuration = CloudSearchConfiguration::from_parameters(&parameters)
                    .with_context(|| "Invalid CloudSearch configuration")?;
                Box::new(CloudSearchRecordStore::new(
                    &configuration,
                    self.logger.clone(),
                )?)
            }
            Backend::Elasticsearch => {
                let configuration = ElasticsearchConfiguration::from_parameters(&parameters)
                    .with_context(|| "Invalid Elasticsearch configuration")?;
                Box::new(
                    ElasticsearchRecordStore::connect(&configuration, self.logger.clone()).await?,
                )
            }
        };

        Ok(store)
    }

    /// Get the shared logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

fn flatten_into(
    prefix: &str,
    table: Map<String, Value>,
    parameters: &mut HashMap<String, String>,
) -> StdResult<()> {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };

        match value.kind {
            ValueKind::Table(nested) => flatten_into(&key, nested, parameters)?,
            ValueKind::Nil => {}
            kind => {
                let value = Value::new(None, kind)
                    .into_string()
                    .with_context(|| format!("Configuration parameter '{key}' is not a scalar"))?;
                parameters.insert(key, value);
            }
        }
    }

    Ok(())
}
