use clap::Parser;

use cloudsearch_bench::{RecordStore, StdResult};

use crate::CommandContext;
use crate::commands::{OperationReport, RecordTarget, field_set};

/// Record SCAN command
#[derive(Parser, Debug, Clone)]
pub struct ScanCommand {
    /// Table and first key of the scan
    #[clap(flatten)]
    target: RecordTarget,

    /// Maximum number of records to read
    #[clap(long, default_value_t = 10)]
    count: usize,

    /// Name of a field to read, can be repeated, every field is read if none is given
    #[clap(short, long = "field")]
    fields: Vec<String>,
}

impl ScanCommand {
    /// Main command execution
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        let store = context.record_store().await?;
        let report = self.run(store.as_ref()).await;
        store.cleanup().await;

        report.print()
    }

    async fn run(&self, store: &dyn RecordStore) -> OperationReport {
        let fields = field_set(&self.fields);
        let mut records = Vec::new();
        let status = store
            .scan(
                &self.target.table,
                &self.target.key,
                self.count,
                fields.as_ref(),
                &mut records,
            )
            .await;

        OperationReport::new("scan", status, &self.target).with_records(records)
    }
}
