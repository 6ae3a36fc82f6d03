use clap::Parser;

use cloudsearch_bench::{FieldMap, RecordStore, StdResult};

use crate::CommandContext;
use crate::commands::{OperationReport, RecordTarget, field_set};

/// Record READ command
#[derive(Parser, Debug, Clone)]
pub struct ReadCommand {
    #[clap(flatten)]
    target: RecordTarget,

    /// Name of a field to read, can be repeated, every field is read if none is given
    #[clap(short, long = "field")]
    fields: Vec<String>,
}

impl ReadCommand {
    /// Main command execution
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        let store = context.record_store().await?;
        let report = self.run(store.as_ref()).await;
        store.cleanup().await;

        report.print()
    }

    async fn run(&self, store: &dyn RecordStore) -> OperationReport {
        let fields = field_set(&self.fields);
        let mut record = FieldMap::new();
        let status = store
            .read(
                &self.target.table,
                &self.target.key,
                fields.as_ref(),
                &mut record,
            )
            .await;

        OperationReport::new("read", status, &self.target).with_record(record)
    }
}
