//! Upload of document batches to the document service of a CloudSearch domain.

use slog::{Logger, debug};

use crate::HttpClient;
use crate::document::{BatchOperation, to_batch};
use crate::error::UploadError;
use crate::logging::LoggerExtensions;
use crate::protocol::ProtocolRoutes;
use crate::query::PostDocumentBatchQuery;

/// Send single operation batches to the document service.
pub struct BatchUploader {
    client: HttpClient,
    batch_path: String,
    table_field: Option<String>,
    logger: Logger,
}

impl BatchUploader {
    /// Create an uploader sending batches through the given document service client
    pub fn new(
        client: HttpClient,
        routes: &ProtocolRoutes,
        table_field: Option<String>,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            batch_path: routes.batch_path.clone(),
            table_field,
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Upload the operation, wrapped in a one element batch.
    ///
    /// The batch succeeds only if the service answers with a success status and reports no error.
    pub async fn upload(&self, operation: &BatchOperation) -> Result<(), UploadError> {
        let documents = to_batch(operation, self.table_field.as_deref());
        let response = self
            .client
            .send(PostDocumentBatchQuery::new(&self.batch_path, documents))
            .await?;

        if !response.is_success() {
            return Err(UploadError::Rejected {
                errors: response.errors.into_iter().map(|error| error.message).collect(),
            });
        }

        debug!(
            self.logger, "Batch uploaded";
            "type" => operation.type_name(),
            "id" => operation.key(),
            "version" => operation.version(),
            "adds" => response.adds,
            "deletes" => response.deletes,
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    use crate::document::Record;
    use crate::protocol::{ProtocolVersion, select};
    use crate::record_store::FieldMap;
    use crate::test::{TestLogger, assert_error_matches, setup_server_and_client};
    use crate::{HttpClientError, protocol};

    use super::*;

    fn uploader(client: HttpClient, version: ProtocolVersion) -> BatchUploader {
        BatchUploader::new(client, &select(version), None, TestLogger::stdout())
    }

    fn add_operation() -> BatchOperation {
        BatchOperation::Add {
            record: Record::new(
                "usertable",
                "user1",
                FieldMap::from([("name".to_string(), "Ada".to_string())]),
            ),
            version: 1_700_000_000,
        }
    }

    fn mock_batch_endpoint<'a>(
        server: &'a MockServer,
        path: &str,
        body: serde_json::Value,
    ) -> httpmock::Mock<'a> {
        server.mock(|when, then| {
            when.method(POST)
                .path(path)
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(body);
            then.status(200)
                .body(json!({ "status": "success", "adds": 1, "deletes": 0 }).to_string());
        })
    }

    #[tokio::test]
    async fn upload_add_to_2013_batch_path() {
        let (server, client) = setup_server_and_client();
        let mock = mock_batch_endpoint(
            &server,
            "/2013-01-01/documents/batch",
            json!([{
                "type": "add",
                "id": "user1",
                "version": 1_700_000_000,
                "lang": "en",
                "fields": { "name": "Ada" }
            }]),
        );

        uploader(client, ProtocolVersion::V2013)
            .upload(&add_operation())
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn upload_delete_to_2011_batch_path() {
        let (server, client) = setup_server_and_client();
        let mock = mock_batch_endpoint(
            &server,
            "/2011-02-01/documents/batch",
            json!([{ "type": "delete", "id": "user1", "version": 12 }]),
        );

        uploader(client, ProtocolVersion::V2011)
            .upload(&BatchOperation::Delete {
                key: "user1".to_string(),
                version: 12,
            })
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn upload_merges_table_field() {
        let (server, client) = setup_server_and_client();
        let mock = mock_batch_endpoint(
            &server,
            "/2013-01-01/documents/batch",
            json!([{
                "type": "add",
                "id": "user1",
                "version": 1_700_000_000,
                "lang": "en",
                "fields": { "name": "Ada", "ycsb_table": "usertable" }
            }]),
        );
        let uploader = BatchUploader::new(
            client,
            &protocol::select(ProtocolVersion::V2013),
            Some("ycsb_table".to_string()),
            TestLogger::stdout(),
        );

        uploader.upload(&add_operation()).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn upload_fails_when_service_reports_errors() {
        let (server, client) = setup_server_and_client();
        server.mock(|when, then| {
            when.any_request();
            then.status(200).body(
                json!({
                    "status": "error",
                    "adds": 0,
                    "deletes": 0,
                    "errors": [{ "message": "Validation error for field 'name'" }]
                })
                .to_string(),
            );
        });

        let error = uploader(client, ProtocolVersion::V2013)
            .upload(&add_operation())
            .await
            .unwrap_err();

        match error {
            UploadError::Rejected { errors } => {
                assert_eq!(vec!["Validation error for field 'name'".to_string()], errors)
            }
            e => panic!("Expected Rejected error, got '{e:?}'."),
        }
    }

    #[tokio::test]
    async fn upload_fails_with_status_and_body_on_non_success_status() {
        let (server, client) = setup_server_and_client();
        server.mock(|when, then| {
            when.any_request();
            then.status(403).body("Request forbidden by administrative rules");
        });

        let error = uploader(client, ProtocolVersion::V2013)
            .upload(&add_operation())
            .await
            .unwrap_err();

        match error {
            UploadError::Status { status, body } => {
                assert_eq!(403, status.as_u16());
                assert_eq!("Request forbidden by administrative rules", body);
            }
            e => panic!("Expected Status error, got '{e:?}'."),
        }
    }

    #[tokio::test]
    async fn upload_fails_on_malformed_response() {
        let (server, client) = setup_server_and_client();
        server.mock(|when, then| {
            when.any_request();
            then.status(200).body("<html></html>");
        });

        let error = uploader(client, ProtocolVersion::V2013)
            .upload(&add_operation())
            .await
            .unwrap_err();

        assert_error_matches!(error, UploadError::MalformedResponse(_));
    }

    #[tokio::test]
    async fn upload_fails_when_service_is_unreachable() {
        let client = HttpClient::builder("http://127.0.0.1:1").build().unwrap();

        let error = uploader(client, ProtocolVersion::V2013)
            .upload(&add_operation())
            .await
            .unwrap_err();

        assert_error_matches!(
            error,
            UploadError::Transport(HttpClientError::RemoteServerUnreachable(_))
        );
    }
}
