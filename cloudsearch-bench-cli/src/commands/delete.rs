use clap::Parser;

use cloudsearch_bench::{RecordStore, StdResult};

use crate::CommandContext;
use crate::commands::{OperationReport, RecordTarget};

/// Record DELETE command
#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    #[clap(flatten)]
    target: RecordTarget,
}

impl DeleteCommand {
    /// Main command execution
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        let store = context.record_store().await?;
        let report = self.run(store.as_ref()).await;
        store.cleanup().await;

        report.print()
    }

    async fn run(&self, store: &dyn RecordStore) -> OperationReport {
        let status = store.delete(&self.target.table, &self.target.key).await;

        OperationReport::new("delete", status, &self.target)
    }
}
