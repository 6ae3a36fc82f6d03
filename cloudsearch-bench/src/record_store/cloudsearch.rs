use async_trait::async_trait;
use slog::{Logger, debug, info, warn};

use crate::configuration::CloudSearchConfiguration;
use crate::document::{BatchOperation, Record, VersionClock};
use crate::error::ConfigurationError;
use crate::logging::LoggerExtensions;
use crate::protocol::{self, endpoint_url};
use crate::record_store::{FieldMap, FieldSet, RecordStore, Status};
use crate::search::{SearchAdapter, SearchOutcome, SearchQuery};
use crate::uploader::BatchUploader;
use crate::{HttpClient, RequestSigner};

/// [RecordStore] backed by a CloudSearch domain.
///
/// Writes are single operation batches sent to the document service, reads and scans are text
/// searches sent to the search service. The API generation is chosen once, at construction.
///
/// The search index is eventually consistent: a record may not be found by a read issued right
/// after its insertion.
pub struct CloudSearchRecordStore {
    uploader: BatchUploader,
    search: SearchAdapter,
    version_clock: VersionClock,
    logger: Logger,
}

impl CloudSearchRecordStore {
    /// Create a store for the configured domain.
    ///
    /// The document and search services share a single connection handle.
    pub fn new(
        configuration: &CloudSearchConfiguration,
        logger: Logger,
    ) -> Result<Self, ConfigurationError> {
        let logger = logger.new_with_component_name::<Self>();
        let routes = protocol::select(configuration.api_version);
        let signer = configuration.credentials().map(|(access_key_id, secret_key)| {
            RequestSigner::cloudsearch(access_key_id, secret_key, &configuration.region)
        });
        let signed = signer.is_some();

        let doc_client = HttpClient::builder(endpoint_url(&configuration.doc_endpoint))
            .with_timeout(configuration.timeout)
            .with_max_retries(configuration.max_retries)
            .with_signer(signer)
            .with_debug(configuration.debug)
            .with_logger(logger.clone())
            .build()
            .map_err(ConfigurationError::HttpClientCreation)?;
        let search_client = doc_client
            .rebase(endpoint_url(&configuration.search_endpoint))
            .map_err(ConfigurationError::HttpClientCreation)?;

        info!(
            logger, "CloudSearch record store created";
            "api_version" => %configuration.api_version,
            "doc_endpoint" => %doc_client.endpoint(),
            "search_endpoint" => %search_client.endpoint(),
            "signed_requests" => signed,
        );

        Ok(Self {
            uploader: BatchUploader::new(
                doc_client,
                &routes,
                configuration.table_field.clone(),
                logger.clone(),
            ),
            search: SearchAdapter::new(search_client, routes, logger.clone()),
            version_clock: VersionClock::default(),
            logger,
        })
    }

    /// Replace the clock issuing the document versions.
    pub fn with_version_clock(mut self, version_clock: VersionClock) -> Self {
        self.version_clock = version_clock;
        self
    }

    async fn upload(&self, operation: BatchOperation) -> Status {
        match self.uploader.upload(&operation).await {
            Ok(()) => Status::Ok,
            Err(error) => {
                warn!(
                    self.logger, "Batch upload failed";
                    "type" => operation.type_name(),
                    "key" => operation.key(),
                    "version" => operation.version(),
                    "error" => ?error,
                );
                Status::Error
            }
        }
    }

    async fn search(&self, text: &str, fields: Option<&FieldSet>) -> Option<SearchOutcome> {
        let query = SearchQuery::new(text)
            .with_return_fields(fields.into_iter().flatten().cloned());

        match self.search.search(&query).await {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(self.logger, "Search failed"; "query" => text, "error" => ?error);
                None
            }
        }
    }
}

#[async_trait]
impl RecordStore for CloudSearchRecordStore {
    async fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Status {
        let operation = BatchOperation::Add {
            record: Record::new(table, key, values.clone()),
            version: self.version_clock.next_version(),
        };

        self.upload(operation).await
    }

    /// Look up the key with a text search, the fields of the first hit are copied.
    async fn read(
        &self,
        _table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut FieldMap,
    ) -> Status {
        match self.search(key, fields).await {
            Some(outcome) => {
                if let Some(hit) = outcome.hits.first() {
                    result.extend(hit.to_field_map(fields));
                }
                Status::Ok
            }
            None => Status::Error,
        }
    }

    /// Same as an insert: the document is replaced as a whole, with a newer version.
    async fn update(&self, table: &str, key: &str, values: &FieldMap) -> Status {
        self.insert(table, key, values).await
    }

    async fn delete(&self, _table: &str, key: &str) -> Status {
        let operation = BatchOperation::Delete {
            key: key.to_string(),
            version: self.version_clock.next_version(),
        };

        self.upload(operation).await
    }

    /// Search the table name as text and append every hit.
    ///
    /// This is not a range scan: `start_key` and `count` are not sent to the service.
    async fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<FieldMap>,
    ) -> Status {
        debug!(self.logger, "Scan issued as a table search"; "table" => table, "start_key" => start_key, "count" => count);

        match self.search(table, fields).await {
            Some(outcome) => {
                result.extend(outcome.hits.iter().map(|hit| hit.to_field_map(fields)));
                Status::Ok
            }
            None => Status::Error,
        }
    }

    async fn cleanup(&self) {
        info!(self.logger, "CloudSearch record store closed");
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    use crate::document::MockEpochClock;
    use crate::protocol::ProtocolVersion;
    use crate::test::{TestLogger, assert_error_matches};

    use super::*;

    const EPOCH: i64 = 1_700_000_000;

    fn fixed_clock(now: i64) -> VersionClock {
        let mut clock = MockEpochClock::new();
        clock.expect_now_epoch_seconds().return_const(now);
        VersionClock::new(Box::new(clock))
    }

    fn store(configuration: &CloudSearchConfiguration) -> CloudSearchRecordStore {
        CloudSearchRecordStore::new(configuration, TestLogger::stdout())
            .unwrap()
            .with_version_clock(fixed_clock(EPOCH))
    }

    fn store_2013(server: &MockServer) -> CloudSearchRecordStore {
        store(&CloudSearchConfiguration::new_sample(
            server.base_url(),
            ProtocolVersion::V2013,
        ))
    }

    fn ada() -> FieldMap {
        FieldMap::from([("name".to_string(), "Ada".to_string())])
    }

    fn mock_successful_batch<'a>(
        server: &'a MockServer,
        documents: serde_json::Value,
    ) -> httpmock::Mock<'a> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/2013-01-01/documents/batch")
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(documents);
            then.status(200)
                .body(json!({ "status": "success", "adds": 1, "deletes": 0 }).to_string());
        })
    }

    fn mock_search_found(server: &MockServer, query: &str, found: u64) {
        let hit: Vec<_> = (0..found)
            .map(|i| json!({ "id": format!("user{i}"), "fields": { "name": format!("name{i}"), "age": [i] } }))
            .collect();
        let body = json!({ "hits": { "found": found, "start": 0, "hit": hit } }).to_string();
        server.mock(|when, then| {
            when.method(GET)
                .path("/2013-01-01/search")
                .query_param("q", query);
            then.status(200).body(body);
        });
    }

    mod construction {
        use super::*;

        #[test]
        fn invalid_endpoint_fails_construction() {
            let configuration =
                CloudSearchConfiguration::new_sample("not a host", ProtocolVersion::V2013);

            let error = CloudSearchRecordStore::new(&configuration, TestLogger::stdout())
                .err()
                .unwrap();

            assert_error_matches!(error, ConfigurationError::HttpClientCreation(_));
        }

        #[tokio::test]
        async fn requests_are_signed_when_credentials_are_configured() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .header_exists("authorization")
                    .header_exists("x-amz-date");
                then.status(200)
                    .body(json!({ "status": "success", "adds": 1, "deletes": 0 }).to_string());
            });
            let configuration = CloudSearchConfiguration {
                access_key_id: Some("AKIDEXAMPLE".to_string()),
                secret_key: Some("secret".to_string()),
                ..CloudSearchConfiguration::new_sample(server.base_url(), ProtocolVersion::V2013)
            };

            let status = store(&configuration).insert("usertable", "user1", &ada()).await;

            assert_eq!(Status::Ok, status);
            mock.assert();
        }
    }

    mod write {
        use super::*;

        #[tokio::test]
        async fn insert_posts_an_add_batch_to_the_2013_path() {
            let server = MockServer::start();
            let mock = mock_successful_batch(
                &server,
                json!([{
                    "type": "add",
                    "id": "user1",
                    "version": EPOCH,
                    "lang": "en",
                    "fields": { "name": "Ada" }
                }]),
            );

            let status = store_2013(&server).insert("usertable", "user1", &ada()).await;

            assert_eq!(0, status.code());
            mock.assert();
        }

        #[tokio::test]
        async fn delete_posts_a_delete_batch() {
            let server = MockServer::start();
            let mock = mock_successful_batch(
                &server,
                json!([{ "type": "delete", "id": "user1", "version": EPOCH }]),
            );

            let status = store_2013(&server).delete("usertable", "user1").await;

            assert_eq!(0, status.code());
            mock.assert();
        }

        #[tokio::test]
        async fn update_is_an_insert_with_a_version_not_lower_than_before() {
            let server = MockServer::start();
            let insert_mock = mock_successful_batch(
                &server,
                json!([{ "type": "add", "id": "user1", "version": 100, "lang": "en", "fields": { "name": "Ada" } }]),
            );
            let update_mock = mock_successful_batch(
                &server,
                json!([{ "type": "add", "id": "user1", "version": 100, "lang": "en", "fields": { "name": "Grace" } }]),
            );
            let mut clock = MockEpochClock::new();
            let mut seq = mockall::Sequence::new();
            for now in [100, 90] {
                clock
                    .expect_now_epoch_seconds()
                    .times(1)
                    .in_sequence(&mut seq)
                    .return_const(now);
            }
            let store = store_2013(&server).with_version_clock(VersionClock::new(Box::new(clock)));

            let insert_status = store.insert("usertable", "user1", &ada()).await;
            let update_status = store
                .update(
                    "usertable",
                    "user1",
                    &FieldMap::from([("name".to_string(), "Grace".to_string())]),
                )
                .await;

            assert_eq!(Status::Ok, insert_status);
            assert_eq!(Status::Ok, update_status);
            insert_mock.assert();
            update_mock.assert();
        }

        #[tokio::test]
        async fn batch_posted_to_the_2011_path_for_2011_domains() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST).path("/2011-02-01/documents/batch");
                then.status(200)
                    .body(json!({ "status": "success", "adds": 0, "deletes": 1 }).to_string());
            });
            let store = store(&CloudSearchConfiguration::new_sample(
                server.base_url(),
                ProtocolVersion::V2011,
            ));

            let status = store.delete("usertable", "user1").await;

            assert_eq!(Status::Ok, status);
            mock.assert();
        }

        #[tokio::test]
        async fn failed_upload_is_logged_and_reported_as_error() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.any_request();
                then.status(400).body("Invalid batch");
            });
            let (logger, log_inspector) = TestLogger::memory();
            let store = CloudSearchRecordStore::new(
                &CloudSearchConfiguration::new_sample(server.base_url(), ProtocolVersion::V2013),
                logger,
            )
            .unwrap();

            let status = store.insert("usertable", "user1", &ada()).await;

            assert_eq!(1, status.code());
            assert!(log_inspector.contains_log("Batch upload failed"), "{log_inspector}");
            assert!(log_inspector.contains_log("Invalid batch"), "{log_inspector}");
        }

        #[tokio::test]
        async fn transient_failures_are_retried_when_configured() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.any_request();
                then.status(503);
            });
            let configuration = CloudSearchConfiguration {
                max_retries: 1,
                ..CloudSearchConfiguration::new_sample(server.base_url(), ProtocolVersion::V2013)
            };

            let status = store(&configuration).delete("usertable", "user1").await;

            assert_eq!(Status::Error, status);
            mock.assert_hits(2);
        }
    }

    mod read {
        use super::*;

        #[tokio::test]
        async fn read_with_no_document_found_fails() {
            let server = MockServer::start();
            mock_search_found(&server, "user1", 0);
            let mut result = FieldMap::new();

            let status = store_2013(&server)
                .read("usertable", "user1", None, &mut result)
                .await;

            assert_eq!(1, status.code());
            assert!(result.is_empty());
        }

        #[tokio::test]
        async fn read_copies_the_fields_of_the_first_hit() {
            let server = MockServer::start();
            mock_search_found(&server, "user1", 2);
            let mut result = FieldMap::new();

            let status = store_2013(&server)
                .read("usertable", "user1", None, &mut result)
                .await;

            assert_eq!(0, status.code());
            assert_eq!(
                FieldMap::from([
                    ("age".to_string(), "0".to_string()),
                    ("name".to_string(), "name0".to_string()),
                ]),
                result
            );
        }

        #[tokio::test]
        async fn read_keeps_only_requested_fields() {
            let server = MockServer::start();
            mock_search_found(&server, "user1", 1);
            let mut result = FieldMap::new();
            let fields = FieldSet::from(["name".to_string()]);

            let status = store_2013(&server)
                .read("usertable", "user1", Some(&fields), &mut result)
                .await;

            assert_eq!(Status::Ok, status);
            assert_eq!(
                FieldMap::from([("name".to_string(), "name0".to_string())]),
                result
            );
        }

        #[tokio::test]
        async fn read_requests_only_the_requested_fields() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/2013-01-01/search")
                    .query_param("q", "user1")
                    .query_param("return", "age,name");
                then.status(200).body(
                    json!({ "hits": { "found": 1, "hit": [{ "id": "user1", "fields": { "name": "Ada" } }] } })
                        .to_string(),
                );
            });
            let mut result = FieldMap::new();
            let fields = FieldSet::from(["name".to_string(), "age".to_string()]);

            let status = store_2013(&server)
                .read("usertable", "user1", Some(&fields), &mut result)
                .await;

            mock.assert();
            assert_eq!(Status::Ok, status);
        }

        #[tokio::test]
        async fn read_accepts_hits_without_id() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/2013-01-01/search");
                then.status(200).body(
                    json!({ "hits": { "found": 1, "hit": [{ "fields": { "name": "Ada" } }] } })
                        .to_string(),
                );
            });
            let mut result = FieldMap::new();

            let status = store_2013(&server)
                .read("usertable", "user1", None, &mut result)
                .await;

            assert_eq!(Status::Ok, status);
            assert_eq!(
                FieldMap::from([("name".to_string(), "Ada".to_string())]),
                result
            );
        }

        #[tokio::test]
        async fn read_on_2011_domain_succeeds_on_status_200() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/2011-02-01/search")
                    .query_param("q", "user1");
                then.status(200).body("{}");
            });
            let configuration = CloudSearchConfiguration {
                search_endpoint: server.url("/2011-02-01/search"),
                ..CloudSearchConfiguration::new_sample(server.base_url(), ProtocolVersion::V2011)
            };
            let mut result = FieldMap::new();

            let status = store(&configuration)
                .read("usertable", "user1", None, &mut result)
                .await;

            assert_eq!(Status::Ok, status);
            assert!(result.is_empty());
            mock.assert();
        }

        #[tokio::test]
        async fn failed_search_is_logged() {
            let server = MockServer::start();
            mock_search_found(&server, "user1", 0);
            let (logger, log_inspector) = TestLogger::memory();
            let store = CloudSearchRecordStore::new(
                &CloudSearchConfiguration::new_sample(server.base_url(), ProtocolVersion::V2013),
                logger,
            )
            .unwrap();

            store.read("usertable", "user1", None, &mut FieldMap::new()).await;

            assert!(log_inspector.contains_log("Search failed"), "{log_inspector}");
            assert!(log_inspector.contains_log("query=user1"), "{log_inspector}");
        }
    }

    mod scan {
        use super::*;

        #[tokio::test]
        async fn scan_searches_the_table_and_appends_every_hit() {
            let server = MockServer::start();
            mock_search_found(&server, "usertable", 3);
            let mut result = Vec::new();

            let status = store_2013(&server)
                .scan("usertable", "user7", 10, None, &mut result)
                .await;

            assert_eq!(Status::Ok, status);
            assert_eq!(3, result.len());
            assert_eq!(Some(&"name2".to_string()), result[2].get("name"));
        }

        #[tokio::test]
        async fn scan_with_no_document_found_fails() {
            let server = MockServer::start();
            mock_search_found(&server, "usertable", 0);
            let mut result = Vec::new();

            let status = store_2013(&server)
                .scan("usertable", "user1", 10, None, &mut result)
                .await;

            assert_eq!(Status::Error, status);
            assert!(result.is_empty());
        }
    }
}
