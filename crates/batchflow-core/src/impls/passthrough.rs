use async_trait::async_trait;

use crate::domain::JobResult;
use crate::graph::JobNode;
use crate::ports::{ExecutionAdapter, check_structure};

/// `batchflow.passthrough` / `noop`: succeeds without producing anything.
///
/// Lets a workflow be driven end to end without a media engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughAdapter;

impl PassthroughAdapter {
    pub const ENGINE: &'static str = "batchflow.passthrough";
    pub const OPERATION: &'static str = "noop";
}

#[async_trait]
impl ExecutionAdapter for PassthroughAdapter {
    fn engine(&self) -> &'static str {
        Self::ENGINE
    }

    fn adapter_id(&self) -> &'static str {
        "batchflow.adapter.passthrough.v1"
    }

    async fn execute(&self, node: &JobNode) -> JobResult {
        match check_structure(node, Self::ENGINE, Self::OPERATION) {
            Ok(()) => JobResult::success(),
            Err(invalid) => invalid,
        }
    }
}
