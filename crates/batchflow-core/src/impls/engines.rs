//! Media engine adapters.
//!
//! The engines expose no request decoder for a serialized parameter blob, so
//! after the structural checks every adapter answers `InvalidInput` instead of
//! guessing parameter values. Wiring a real decoder in changes only the
//! second step of `execute`.

use async_trait::async_trait;

use crate::domain::JobResult;
use crate::graph::JobNode;
use crate::ports::{ExecutionAdapter, check_structure};

fn decoder_unavailable(adapter: &str, request_type: &str) -> JobResult {
    JobResult::invalid_input(format!(
        "{adapter}: no decoder for {request_type}; refusing to invent parameters"
    ))
}

/// `engine.audio` / `prepare`
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioEngineAdapter;

impl AudioEngineAdapter {
    pub const ENGINE: &'static str = "engine.audio";
    pub const OPERATION: &'static str = "prepare";
}

#[async_trait]
impl ExecutionAdapter for AudioEngineAdapter {
    fn engine(&self) -> &'static str {
        Self::ENGINE
    }

    fn adapter_id(&self) -> &'static str {
        "batchflow.adapter.audio.v1"
    }

    async fn execute(&self, node: &JobNode) -> JobResult {
        if let Err(invalid) = check_structure(node, Self::ENGINE, Self::OPERATION) {
            return invalid;
        }
        decoder_unavailable("AudioEngineAdapter", "AudioRequest")
    }
}

/// `engine.video` / `prepare`
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoEngineAdapter;

impl VideoEngineAdapter {
    pub const ENGINE: &'static str = "engine.video";
    pub const OPERATION: &'static str = "prepare";
}

#[async_trait]
impl ExecutionAdapter for VideoEngineAdapter {
    fn engine(&self) -> &'static str {
        Self::ENGINE
    }

    fn adapter_id(&self) -> &'static str {
        "batchflow.adapter.video.v1"
    }

    async fn execute(&self, node: &JobNode) -> JobResult {
        if let Err(invalid) = check_structure(node, Self::ENGINE, Self::OPERATION) {
            return invalid;
        }
        decoder_unavailable("VideoEngineAdapter", "VideoRequest")
    }
}

/// `engine.convert` / `prepare`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertEngineAdapter;

impl ConvertEngineAdapter {
    pub const ENGINE: &'static str = "engine.convert";
    pub const OPERATION: &'static str = "prepare";
}

#[async_trait]
impl ExecutionAdapter for ConvertEngineAdapter {
    fn engine(&self) -> &'static str {
        Self::ENGINE
    }

    fn adapter_id(&self) -> &'static str {
        "batchflow.adapter.convert.v1"
    }

    async fn execute(&self, node: &JobNode) -> JobResult {
        if let Err(invalid) = check_structure(node, Self::ENGINE, Self::OPERATION) {
            return invalid;
        }
        decoder_unavailable("ConvertEngineAdapter", "ConvertRequest")
    }
}

/// `engine.meta` / `plan_repair`
///
/// Treats media essence as read-only; never infers metadata or picks a repair
/// on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaEngineAdapter;

impl MetaEngineAdapter {
    pub const ENGINE: &'static str = "engine.meta";
    pub const OPERATION: &'static str = "plan_repair";
}

#[async_trait]
impl ExecutionAdapter for MetaEngineAdapter {
    fn engine(&self) -> &'static str {
        Self::ENGINE
    }

    fn adapter_id(&self) -> &'static str {
        "batchflow.adapter.meta.v1"
    }

    async fn execute(&self, node: &JobNode) -> JobResult {
        if let Err(invalid) = check_structure(node, Self::ENGINE, Self::OPERATION) {
            return invalid;
        }
        decoder_unavailable("MetaEngineAdapter", "MetaRepairRequest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobDefinition, JobResultStatus};
    use rstest::rstest;

    fn node(engine: &str, operation: &str, params: &str) -> JobNode {
        JobNode::from_definition(&JobDefinition::new(engine, operation, params, vec![], vec![]))
    }

    #[rstest]
    #[case::audio(&AudioEngineAdapter as &dyn ExecutionAdapter, "prepare")]
    #[case::video(&VideoEngineAdapter as &dyn ExecutionAdapter, "prepare")]
    #[case::convert(&ConvertEngineAdapter as &dyn ExecutionAdapter, "prepare")]
    #[case::meta(&MetaEngineAdapter as &dyn ExecutionAdapter, "plan_repair")]
    #[tokio::test]
    async fn valid_request_is_refused_without_decoder(
        #[case] adapter: &dyn ExecutionAdapter,
        #[case] operation: &str,
    ) {
        let result = adapter.execute(&node(adapter.engine(), operation, r#"{"x":1}"#)).await;
        assert_eq!(result.status, JobResultStatus::InvalidInput);
        assert!(result.engine_message.contains("no decoder"));
        assert!(result.output_artifacts.is_empty());
    }

    #[tokio::test]
    async fn structural_failure_wins_over_decoder() {
        let result = AudioEngineAdapter.execute(&node("engine.video", "prepare", "{}")).await;
        assert_eq!(result.status, JobResultStatus::InvalidInput);
        assert!(result.engine_message.contains("invalid engine_identifier"));
    }

    #[tokio::test]
    async fn results_are_deterministic() {
        let n = node("engine.meta", "plan_repair", "{}");
        let a = MetaEngineAdapter.execute(&n).await;
        let b = MetaEngineAdapter.execute(&n).await;
        assert_eq!(a, b);
    }
}
