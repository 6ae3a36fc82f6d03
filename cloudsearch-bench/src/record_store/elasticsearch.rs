use async_trait::async_trait;
use serde_json::Value;
use slog::{Logger, info, warn};

use crate::configuration::ElasticsearchConfiguration;
use crate::document::to_field_map;
use crate::error::ConfigurationError;
use crate::logging::LoggerExtensions;
use crate::protocol::endpoint_url;
use crate::query::{
    DeleteDocumentQuery, DeleteIndexQuery, DocumentLocation, DocumentSource, GetDocumentQuery,
    HeadIndexQuery, PostIndexSearchQuery, PutDocumentQuery, PutIndexQuery,
};
use crate::record_store::{FieldMap, FieldSet, RecordStore, Status};
use crate::{HttpClient, HttpClientResult};

/// [RecordStore] backed by an Elasticsearch index, through the REST API of the first
/// configured host.
///
/// Each table is a mapping type of the index, each record a document whose source is the flat
/// field map.
pub struct ElasticsearchRecordStore {
    client: HttpClient,
    index: String,
    logger: Logger,
}

impl ElasticsearchRecordStore {
    /// Connect to the cluster and prepare the index.
    ///
    /// With `new_db` set the index is deleted then created again, otherwise it is only created
    /// if it does not exist yet. Failing to prepare the index is logged but does not fail the
    /// connection.
    pub async fn connect(
        configuration: &ElasticsearchConfiguration,
        logger: Logger,
    ) -> Result<Self, ConfigurationError> {
        let logger = logger.new_with_component_name::<Self>();
        let client = HttpClient::builder(endpoint_url(configuration.primary_host()))
            .with_logger(logger.clone())
            .build()
            .map_err(ConfigurationError::HttpClientCreation)?;

        info!(
            logger, "Elasticsearch record store created";
            "hosts" => configuration.hosts.join(","),
            "cluster_name" => &configuration.cluster_name,
            "index" => &configuration.index_key,
        );

        let store = Self {
            client,
            index: configuration.index_key.clone(),
            logger,
        };
        store.prepare_index(configuration.new_db).await;

        Ok(store)
    }

    async fn prepare_index(&self, new_db: bool) {
        if new_db {
            if let Err(error) = self.recreate_index().await {
                warn!(self.logger, "Failed to initialize the index"; "index" => &self.index, "error" => ?error);
            }
            return;
        }

        match self.client.send(HeadIndexQuery::new(&self.index)).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(error) = self.client.send(PutIndexQuery::new(&self.index)).await {
                    warn!(self.logger, "Failed to create the index"; "index" => &self.index, "error" => ?error);
                }
            }
            Err(error) => {
                warn!(
                    self.logger, "Failed to determine if the index exists";
                    "index" => &self.index,
                    "error" => ?error
                );
            }
        }
    }

    async fn recreate_index(&self) -> HttpClientResult<()> {
        self.client.send(DeleteIndexQuery::new(&self.index)).await?;
        self.client.send(PutIndexQuery::new(&self.index)).await
    }

    fn location(&self, table: &str, key: &str) -> DocumentLocation {
        DocumentLocation::new(&self.index, table, key)
    }

    fn report<T>(&self, operation: &str, key: &str, result: HttpClientResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    self.logger, "Record operation failed";
                    "operation" => operation,
                    "key" => key,
                    "error" => ?error
                );
                None
            }
        }
    }

    async fn fetch_source(&self, table: &str, key: &str) -> Option<DocumentSource> {
        let result = self.client.send(GetDocumentQuery::new(self.location(table, key))).await;

        match self.report("read", key, result)? {
            Some(source) => Some(source),
            None => {
                warn!(self.logger, "Record not found"; "table" => table, "key" => key);
                None
            }
        }
    }

    async fn index_source(
        &self,
        operation: &str,
        table: &str,
        key: &str,
        source: DocumentSource,
    ) -> Status {
        let result = self
            .client
            .send(PutDocumentQuery::new(self.location(table, key), source))
            .await;

        self.report(operation, key, result).map_or(Status::Error, |_| Status::Ok)
    }
}

fn to_source(values: &FieldMap) -> DocumentSource {
    values
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect()
}

#[async_trait]
impl RecordStore for ElasticsearchRecordStore {
    async fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Status {
        self.index_source("insert", table, key, to_source(values)).await
    }

    async fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut FieldMap,
    ) -> Status {
        match self.fetch_source(table, key).await {
            Some(source) => {
                result.extend(to_field_map(&source, fields));
                Status::Ok
            }
            None => Status::Error,
        }
    }

    /// Fetch the stored source, overlay the new values and index it again.
    async fn update(&self, table: &str, key: &str, values: &FieldMap) -> Status {
        let Some(mut source) = self.fetch_source(table, key).await else {
            return Status::Error;
        };
        source.extend(to_source(values));

        self.index_source("update", table, key, source).await
    }

    async fn delete(&self, table: &str, key: &str) -> Status {
        let result = self
            .client
            .send(DeleteDocumentQuery::new(self.location(table, key)))
            .await;

        self.report("delete", key, result).map_or(Status::Error, |_| Status::Ok)
    }

    /// Search the whole index for the `count` first documents with an id greater than or equal
    /// to `start_key`.
    async fn scan(
        &self,
        _table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<FieldMap>,
    ) -> Status {
        let response = self
            .client
            .send(PostIndexSearchQuery::range_from(&self.index, start_key, count))
            .await;

        match self.report("scan", start_key, response) {
            Some(response) => {
                result.extend(
                    response
                        .hits
                        .hits
                        .iter()
                        .map(|hit| to_field_map(&hit.source, fields)),
                );
                Status::Ok
            }
            None => Status::Error,
        }
    }

    async fn cleanup(&self) {
        info!(self.logger, "Elasticsearch record store closed"; "index" => &self.index);
    }
}
