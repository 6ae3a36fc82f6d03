use clap::Parser;

use cloudsearch_bench::{FieldMap, RecordStore, StdResult};

use crate::CommandContext;
use crate::commands::{OperationReport, RecordTarget, parse_field};

/// Record INSERT command
#[derive(Parser, Debug, Clone)]
pub struct InsertCommand {
    #[clap(flatten)]
    target: RecordTarget,

    /// Field of the record as `name=value`, can be repeated
    #[clap(short, long = "field", value_parser = parse_field, required = true)]
    fields: Vec<(String, String)>,
}

impl InsertCommand {
    /// Main command execution
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        let store = context.record_store().await?;
        let report = self.run(store.as_ref()).await;
        store.cleanup().await;

        report.print()
    }

    async fn run(&self, store: &dyn RecordStore) -> OperationReport {
        let values: FieldMap = self.fields.iter().cloned().collect();
        let status = store
            .insert(&self.target.table, &self.target.key, &values)
            .await;

        OperationReport::new("insert", status, &self.target)
    }
}
