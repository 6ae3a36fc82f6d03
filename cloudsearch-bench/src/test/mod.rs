//! Test utilities.
//!
//! ⚠ Do not use in production code ⚠


use httpmock::MockServer;

use crate::HttpClient;

pub(crate) use logging::TestLogger;

macro_rules! assert_error_matches {
    ($error:expr, $error_type:pat) => {
        assert!(
            matches!($error, $error_type),
            "Expected {} error, got '{:?}'.",
            stringify!($error_type),
            $error
        );
    };
}
pub(crate) use assert_error_matches;

pub(crate) fn setup_server_and_client() -> (MockServer, HttpClient) {
    let server = MockServer::start();
    let client = HttpClient::builder(server.base_url())
        .with_logger(TestLogger::stdout())
        .build()
        .unwrap();

    (server, client)
}
