#![doc = include_str!("../README.md")]

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{ConfigBuilder, FileFormat, Map, Source, Value, ValueKind, builder::DefaultState};
use slog::{Drain, Fuse, Level, Logger, debug};
use slog_term::Decorator;
use std::io::Write;
use std::sync::Arc;
use std::{fs::File, path::PathBuf};

use cloudsearch_bench::{CloudSearchConfiguration, StdResult};
use cloudsearch_bench_cli::commands::{
    DeleteCommand, InsertCommand, ReadCommand, ReportCommand, ScanCommand, UpdateCommand,
    parse_field,
};
use cloudsearch_bench_cli::{Backend, CommandContext};

enum LogOutputType {
    StdErr,
    File(String),
}

impl LogOutputType {
    fn get_writer(&self) -> StdResult<Box<dyn Write + Send>> {
        let writer: Box<dyn Write + Send> = match self {
            LogOutputType::StdErr => Box::new(std::io::stderr()),
            LogOutputType::File(filepath) => Box::new(
                File::create(filepath)
                    .with_context(|| format!("Can not create output log file: {filepath}"))?,
            ),
        };

        Ok(writer)
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "cloudsearch-bench")]
#[clap(
    about = "This program runs single record operations of a storage benchmark against a CloudSearch domain or an Elasticsearch cluster, and reports benchmark outputs.",
    long_about = None
)]
#[command(version)]
pub struct Args {
    /// Available commands
    #[clap(subcommand)]
    command: BenchCommands,

    /// Run Mode.
    #[clap(long, env = "RUN_MODE", default_value = "dev")]
    run_mode: String,

    /// Verbosity level (-v=warning, -vv=info, -vvv=debug).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory where configuration file is located.
    #[clap(long, default_value = "./config")]
    pub config_directory: PathBuf,

    /// Benchmark properties file (`name=value` lines), applied over the configuration file.
    #[clap(long, env = "PROPERTIES_FILE")]
    properties_file: Option<PathBuf>,

    /// Set a configuration property as `name=value`, can be repeated.
    #[clap(short = 'p', long = "property", value_parser = parse_field)]
    properties: Vec<(String, String)>,

    /// Document service targeted by the record commands.
    #[clap(long, value_enum, env = "BENCH_BACKEND", default_value = "cloudsearch")]
    backend: Backend,

    /// Override configuration CloudSearch search service endpoint.
    #[clap(long, env = "CLOUDSEARCH_SEARCH_ENDPOINT")]
    search_endpoint: Option<String>,

    /// Override configuration CloudSearch document service endpoint.
    #[clap(long, env = "CLOUDSEARCH_DOC_ENDPOINT")]
    doc_endpoint: Option<String>,

    /// Enable JSON output for logs displayed according to verbosity level
    #[clap(long)]
    log_format_json: bool,

    /// Redirect the logs to a file
    #[clap(long, alias("o"))]
    log_output: Option<String>,
}

impl Args {
    pub async fn execute(&self, root_logger: Logger) -> StdResult<()> {
        debug!(
            root_logger,
            "CloudSearch benchmark CLI version: {}",
            env!("CARGO_PKG_VERSION")
        );
        debug!(root_logger, "Run Mode: {}", self.run_mode);
        let config_builder = self.config_builder(&root_logger);
        let context = CommandContext::new(config_builder, self.backend, root_logger);

        self.command.execute(context).await
    }

    fn config_builder(&self, logger: &Logger) -> ConfigBuilder<DefaultState> {
        let filename = format!("{}/{}.json", self.config_directory.display(), self.run_mode);
        debug!(logger, "Reading configuration file '{filename}'.");
        let mut config_builder = config::Config::builder()
            .add_source(config::File::with_name(&filename).required(false));

        if let Some(properties_file) = &self.properties_file {
            debug!(logger, "Reading properties file '{}'.", properties_file.display());
            config_builder = config_builder.add_source(config::File::new(
                &properties_file.to_string_lossy(),
                FileFormat::Ini,
            ));
        }

        config_builder.add_source(self.clone())
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::Error,
            1 => Level::Warning,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    fn get_log_output_type(&self) -> LogOutputType {
        if let Some(output_filepath) = &self.log_output {
            LogOutputType::File(output_filepath.to_string())
        } else {
            LogOutputType::StdErr
        }
    }

    fn wrap_drain<D: Decorator + Send + 'static>(&self, decorator: D) -> Fuse<slog_async::Async> {
        let drain = slog_term::CompactFormat::new(decorator).build().fuse();
        let drain = slog::LevelFilter::new(drain, self.log_level()).fuse();

        slog_async::Async::new(drain).build().fuse()
    }

    fn build_logger(&self) -> StdResult<Logger> {
        let log_output_type = self.get_log_output_type();
        let writer = log_output_type.get_writer()?;

        let drain = if self.log_format_json {
            let drain = slog_bunyan::with_name("cloudsearch-bench", writer)
                .set_pretty(false)
                .build()
                .fuse();
            let drain = slog::LevelFilter::new(drain, self.log_level()).fuse();

            slog_async::Async::new(drain).build().fuse()
        } else {
            match log_output_type {
                LogOutputType::StdErr => self.wrap_drain(slog_term::TermDecorator::new().build()),
                LogOutputType::File(_) => self.wrap_drain(slog_term::PlainDecorator::new(writer)),
            }
        };

        Ok(Logger::root(Arc::new(drain), slog::o!()))
    }
}

impl Source for Args {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        let mut map = Map::new();
        let namespace = "clap arguments".to_string();

        for (name, value) in &self.properties {
            map.insert(
                name.clone(),
                Value::new(Some(&namespace), ValueKind::from(value.clone())),
            );
        }

        if let Some(search_endpoint) = self.search_endpoint.clone() {
            map.insert(
                CloudSearchConfiguration::SEARCH_ENDPOINT.to_string(),
                Value::new(Some(&namespace), ValueKind::from(search_endpoint)),
            );
        }

        if let Some(doc_endpoint) = self.doc_endpoint.clone() {
            map.insert(
                CloudSearchConfiguration::DOC_ENDPOINT.to_string(),
                Value::new(Some(&namespace), ValueKind::from(doc_endpoint)),
            );
        }

        Ok(map)
    }
}

#[derive(Subcommand, Debug, Clone)]
enum BenchCommands {
    /// Insert a record
    #[clap(arg_required_else_help = true)]
    Insert(InsertCommand),

    /// Read a record
    #[clap(arg_required_else_help = true)]
    Read(ReadCommand),

    /// Update the fields of a record
    #[clap(arg_required_else_help = true)]
    Update(UpdateCommand),

    /// Delete a record
    #[clap(arg_required_else_help = true)]
    Delete(DeleteCommand),

    /// Read the records following a key
    #[clap(arg_required_else_help = true)]
    Scan(ScanCommand),

    /// Print a metric of a benchmark output, one line per time step
    #[clap(arg_required_else_help = true)]
    Report(ReportCommand),
}

impl BenchCommands {
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        match self {
            Self::Insert(cmd) => cmd.execute(context).await,
            Self::Read(cmd) => cmd.execute(context).await,
            Self::Update(cmd) => cmd.execute(context).await,
            Self::Delete(cmd) => cmd.execute(context).await,
            Self::Scan(cmd) => cmd.execute(context).await,
            Self::Report(cmd) => cmd.execute(context).await,
        }
    }
}

#[tokio::main]
async fn main() -> StdResult<()> {
    // Load args
    let args = Args::parse();
    let logger = args.build_logger()?;

    args.execute(logger).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn discard_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("cloudsearch-bench-cli")
            .join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn properties_and_endpoints_are_collected_as_configuration() {
        let args = Args::try_parse_from([
            "cloudsearch-bench",
            "-p",
            "cloudsearch.apiVersion=2011",
            "--search-endpoint",
            "search.example.com",
            "delete",
            "user1",
        ])
        .unwrap();

        let map = args.collect().unwrap();

        assert_eq!(
            "2011",
            map["cloudsearch.apiVersion"].clone().into_string().unwrap()
        );
        assert_eq!(
            "search.example.com",
            map[CloudSearchConfiguration::SEARCH_ENDPOINT]
                .clone()
                .into_string()
                .unwrap()
        );
        assert!(!map.contains_key(CloudSearchConfiguration::DOC_ENDPOINT));
    }

    #[test]
    fn invalid_property_is_rejected() {
        Args::try_parse_from(["cloudsearch-bench", "-p", "novalue", "delete", "user1"])
            .expect_err("A property without '=' should be rejected");
    }

    #[test]
    fn parse_elasticsearch_backend() {
        let args = Args::try_parse_from([
            "cloudsearch-bench",
            "--backend",
            "elasticsearch",
            "read",
            "user1",
        ])
        .unwrap();

        assert_eq!(Backend::Elasticsearch, args.backend);
    }

    #[test]
    fn configuration_layers_are_applied_in_order() {
        let dir = temp_dir("configuration_layers_are_applied_in_order");
        std::fs::write(
            dir.join("dev.json"),
            r#"{ "cloudsearch": { "searchEndpoint": "json.example.com", "docEndpoint": "json-doc.example.com", "region": "eu-west-1" } }"#,
        )
        .unwrap();
        let properties_file = dir.join("workload.properties");
        let mut file = File::create(&properties_file).unwrap();
        writeln!(file, "cloudsearch.docEndpoint=properties-doc.example.com").unwrap();
        writeln!(file, "cloudsearch.region=us-east-1").unwrap();
        let args = Args::try_parse_from([
            "cloudsearch-bench",
            "--run-mode",
            "dev",
            "--config-directory",
            dir.to_str().unwrap(),
            "--properties-file",
            properties_file.to_str().unwrap(),
            "--doc-endpoint",
            "cli-doc.example.com",
            "delete",
            "user1",
        ])
        .unwrap();
        let logger = discard_logger();
        let context = CommandContext::new(args.config_builder(&logger), args.backend, logger);

        let parameters = context.config_parameters().unwrap();

        assert_eq!(
            Some("json.example.com".to_string()),
            parameters.get(CloudSearchConfiguration::SEARCH_ENDPOINT)
        );
        assert_eq!(
            Some("cli-doc.example.com".to_string()),
            parameters.get(CloudSearchConfiguration::DOC_ENDPOINT)
        );
        assert_eq!(
            Some("us-east-1".to_string()),
            parameters.get(CloudSearchConfiguration::REGION)
        );
    }

    #[tokio::test]
    async fn report_of_a_missing_file_fails() {
        let args = Args::try_parse_from([
            "cloudsearch-bench",
            "report",
            "--file",
            "/non/existent/benchmark.out",
        ])
        .unwrap();

        let error = args
            .execute(discard_logger())
            .await
            .expect_err("Should fail if the benchmark output can not be read");

        assert!(
            error.to_string().contains("Can not read benchmark output file"),
            "unexpected error: {error}"
        );
    }
}
