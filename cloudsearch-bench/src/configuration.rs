//! Configuration of the record store adapters.
//!
//! The benchmark hands its properties to the adapters as a flat map of string keys and values,
//! held by [ConfigParameters]. Each adapter then reads the keys it knows into an immutable typed
//! configuration, [CloudSearchConfiguration] or [ElasticsearchConfiguration].

use std::collections::HashMap;
use std::time::Duration;

use crate::ConfigurationError;
use crate::protocol::ProtocolVersion;

/// Configuration parameters holder
///
/// Keys are matched case-insensitively.
#[derive(Debug, Default, PartialEq)]
pub struct ConfigParameters {
    parameters: HashMap<String, String>,
}

impl ConfigParameters {
    /// Constructor
    pub fn new(parameters: HashMap<String, String>) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Useful constructor for testing
    pub fn build(parameters: &[(&str, &str)]) -> Self {
        let parameters = parameters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self::new(parameters)
    }

    /// Add or replace a parameter in the holder
    pub fn add_parameter(&mut self, name: &str, value: &str) -> &mut Self {
        let _ = self
            .parameters
            .insert(name.to_lowercase(), value.to_string());

        self
    }

    /// Fetch a parameter from the holder.
    pub fn get(&self, name: &str) -> Option<String> {
        self.parameters.get(&name.to_lowercase()).cloned()
    }

    /// Fetch a parameter from the holder. If the parameter is not set, the
    /// given default value is returned instead.
    pub fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default.to_string())
    }

    /// Fetch a parameter from the holder. If the parameter is not set, an error
    /// is raised.
    pub fn require(&self, name: &str) -> Result<String, ConfigurationError> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::Required(name.to_string()))
    }

    /// Fetch a boolean parameter, `default` is used if the parameter is not set.
    pub fn get_bool_or(&self, name: &str, default: bool) -> Result<bool, ConfigurationError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .to_lowercase()
                .parse::<bool>()
                .map_err(|_| invalid_parameter(name, &value)),
        }
    }

    /// Fetch an integer parameter, `default` is used if the parameter is not set.
    pub fn get_i64_or(&self, name: &str, default: i64) -> Result<i64, ConfigurationError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid_parameter(name, &value)),
        }
    }
}

fn invalid_parameter(name: &str, value: &str) -> ConfigurationError {
    ConfigurationError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Configuration of a [CloudSearchRecordStore][crate::CloudSearchRecordStore].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSearchConfiguration {
    /// Search endpoint of the domain
    pub search_endpoint: String,

    /// Document service endpoint of the domain
    pub doc_endpoint: String,

    /// Socket timeout, `None` to keep the HTTP client default
    pub timeout: Option<Duration>,

    /// Number of additional attempts made by the transport on retryable failures
    pub max_retries: u32,

    /// API generation spoken with the domain
    pub api_version: ProtocolVersion,

    /// Access key id used to sign the requests
    pub access_key_id: Option<String>,

    /// Secret key used to sign the requests
    pub secret_key: Option<String>,

    /// Region used to sign the requests
    pub region: String,

    /// Log every outbound request and its response in details
    pub debug: bool,

    /// Reserved field receiving the table name of inserted records, if any
    pub table_field: Option<String>,
}

impl CloudSearchConfiguration {
    /// Parameter key: search endpoint (required)
    pub const SEARCH_ENDPOINT: &'static str = "cloudsearch.searchEndpoint";
    /// Parameter key: document endpoint (required)
    pub const DOC_ENDPOINT: &'static str = "cloudsearch.docEndpoint";
    /// Parameter key: access key id
    pub const AWS_ACCESS_KEY_ID: &'static str = "aws.accessKeyId";
    /// Parameter key: secret key
    pub const AWS_SECRET_ACCESS_KEY: &'static str = "aws.secretKey";
    /// Parameter key: debug flag
    pub const DEBUG: &'static str = "cloudsearch.debug";
    /// Parameter key: socket timeout in milliseconds, `-1` meaning unset
    pub const TIMEOUT: &'static str = "cloudsearch.socketTimeout";
    /// Parameter key: max retry count, `-1` meaning unset
    pub const MAX_RETRY_COUNT: &'static str = "cloudsearch.retryCount";
    /// Parameter key: signing region
    pub const REGION: &'static str = "cloudsearch.region";
    /// Parameter key: API version, `2011` or `2013`
    pub const API_VERSION: &'static str = "cloudsearch.apiVersion";
    /// Parameter key: reserved field receiving the table name
    pub const TABLE_FIELD: &'static str = "cloudsearch.tableField";

    /// Default signing region
    pub const DEFAULT_REGION: &'static str = "us-west-2";
    /// Default API version
    pub const DEFAULT_API_VERSION: &'static str = "2013";

    /// Read the configuration from the benchmark parameters.
    pub fn from_parameters(params: &ConfigParameters) -> Result<Self, ConfigurationError> {
        let timeout_millis = params.get_i64_or(Self::TIMEOUT, -1)?;
        let retry_count = params.get_i64_or(Self::MAX_RETRY_COUNT, -1)?;
        let api_version = params
            .get_or(Self::API_VERSION, Self::DEFAULT_API_VERSION)
            .parse::<ProtocolVersion>()?;

        Ok(Self {
            search_endpoint: require_non_empty(params, Self::SEARCH_ENDPOINT)?,
            doc_endpoint: require_non_empty(params, Self::DOC_ENDPOINT)?,
            timeout: u64::try_from(timeout_millis).ok().map(Duration::from_millis),
            max_retries: u32::try_from(retry_count.max(0))
                .map_err(|_| invalid_parameter(Self::MAX_RETRY_COUNT, &retry_count.to_string()))?,
            api_version,
            access_key_id: params.get(Self::AWS_ACCESS_KEY_ID),
            secret_key: params.get(Self::AWS_SECRET_ACCESS_KEY),
            region: params.get_or(Self::REGION, Self::DEFAULT_REGION),
            debug: params.get_bool_or(Self::DEBUG, false)?,
            table_field: params.get(Self::TABLE_FIELD).filter(|f| !f.is_empty()),
        })
    }

    /// Credentials used to sign the requests, only if both parts are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_key) {
            (Some(access_key_id), Some(secret_key)) => {
                Some((access_key_id.as_str(), secret_key.as_str()))
            }
            _ => None,
        }
    }

    /// Create a sample configuration mainly for tests
    #[doc(hidden)]
    pub fn new_sample<S: Into<String>>(endpoint: S, api_version: ProtocolVersion) -> Self {
        let endpoint = endpoint.into();
        Self {
            search_endpoint: endpoint.clone(),
            doc_endpoint: endpoint,
            timeout: None,
            max_retries: 0,
            api_version,
            access_key_id: None,
            secret_key: None,
            region: Self::DEFAULT_REGION.to_string(),
            debug: false,
            table_field: None,
        }
    }
}

/// Configuration of an [ElasticsearchRecordStore][crate::ElasticsearchRecordStore].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticsearchConfiguration {
    /// Name of the index holding every table
    pub index_key: String,

    /// Name of the cluster, informative only
    pub cluster_name: String,

    /// Hosts of the cluster, only the first one is used
    pub hosts: Vec<String>,

    /// Drop and recreate the index when the adapter is created
    pub new_db: bool,
}

impl ElasticsearchConfiguration {
    /// Parameter key: index name
    pub const INDEX_KEY: &'static str = "es.index.key";
    /// Parameter key: cluster name
    pub const CLUSTER_NAME: &'static str = "cluster.name";
    /// Parameter key: comma separated list of hosts
    pub const HOSTS_LIST: &'static str = "elasticsearch.hosts.list";
    /// Parameter key: recreate the index on start
    pub const NEW_DB: &'static str = "elasticsearch.newdb";

    /// Default index name
    pub const DEFAULT_INDEX_KEY: &'static str = "ycsb";
    /// Default cluster name
    pub const DEFAULT_CLUSTER_NAME: &'static str = "ycsb.cluster";
    /// Default host
    pub const DEFAULT_REMOTE_HOST: &'static str = "localhost:9200";

    /// Read the configuration from the benchmark parameters.
    pub fn from_parameters(params: &ConfigParameters) -> Result<Self, ConfigurationError> {
        let hosts: Vec<String> = params
            .get_or(Self::HOSTS_LIST, Self::DEFAULT_REMOTE_HOST)
            .split(',')
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(ConfigurationError::Required(Self::HOSTS_LIST.to_string()));
        }

        Ok(Self {
            index_key: params.get_or(Self::INDEX_KEY, Self::DEFAULT_INDEX_KEY),
            cluster_name: params.get_or(Self::CLUSTER_NAME, Self::DEFAULT_CLUSTER_NAME),
            hosts,
            new_db: params.get_bool_or(Self::NEW_DB, false)?,
        })
    }

    /// Host the adapter connects to.
    pub fn primary_host(&self) -> &str {
        &self.hosts[0]
    }
}

fn require_non_empty(params: &ConfigParameters, name: &str) -> Result<String, ConfigurationError> {
    let value = params.require(name)?;
    if value.trim().is_empty() {
        return Err(ConfigurationError::Required(name.to_string()));
    }

    Ok(value)
}
