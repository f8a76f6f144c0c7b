//! ExecutionAdapter port - 外部エンジンとの境界
//!
//! - 入力: `JobNode`、出力: `JobResult`
//! - 構造チェックのみ行い、パラメータの中身は解釈しない

use async_trait::async_trait;

use crate::domain::{ErrorCode, ErrorContext, ErrorSeverity, FlowError, FlowResult, JobResult};
use crate::graph::JobNode;

/// Runs one job on one engine family.
///
/// Adapters hold no state. The same `JobNode` must produce the same
/// `JobResult` on every call, in every process. An adapter that cannot decode
/// a request returns `InvalidInput`; it never fills in default parameters.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Engine identifier this adapter is routed by (e.g. `engine.audio`).
    fn engine(&self) -> &'static str;

    /// Versioned name of the adapter implementation, for diagnostics.
    fn adapter_id(&self) -> &'static str;

    async fn execute(&self, node: &JobNode) -> JobResult;
}

/// Structural checks shared by the adapters: engine and operation match,
/// parameters are present. Parameters are never interpreted.
pub fn validate_structure(node: &JobNode, engine: &str, operation: &str) -> FlowResult<()> {
    let fail = |message: String| {
        Err(FlowError::new(ErrorCode::InvalidInput, ErrorSeverity::Error, message)
            .with_context(
                ErrorContext::new("validate_job_node", engine)
                    .with_param("job_id", node.id().to_string()),
            ))
    };
    if node.engine_name() != engine {
        return fail(format!(
            "invalid engine_identifier {:?} (expected {engine:?})",
            node.engine_name()
        ));
    }
    if node.api_operation() != operation {
        return fail(format!(
            "invalid api_operation {:?} (expected {operation:?})",
            node.api_operation()
        ));
    }
    if node.parameters_blob().is_empty() {
        return fail("parameters_blob is empty".to_string());
    }
    Ok(())
}

/// `validate_structure`, with a failure already turned into the
/// `InvalidInput` result the adapter returns.
pub fn check_structure(node: &JobNode, engine: &str, operation: &str) -> Result<(), JobResult> {
    validate_structure(node, engine, operation).map_err(|err| JobResult::invalid_input(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, JobResultStatus};
    use rstest::rstest;

    #[rstest]
    #[case::ok("engine.audio", "prepare", &b"{}"[..], None)]
    #[case::wrong_engine("engine.video", "prepare", &b"{}"[..], Some("invalid engine_identifier"))]
    #[case::wrong_operation("engine.audio", "render", &b"{}"[..], Some("invalid api_operation"))]
    #[case::empty_params("engine.audio", "prepare", &b""[..], Some("parameters_blob is empty"))]
    fn structural_checks(
        #[case] engine: &str,
        #[case] operation: &str,
        #[case] params: &[u8],
        #[case] problem: Option<&str>,
    ) {
        let node = JobNode::with_id(JobId::from_digest([1; 32]), engine, operation, params.to_vec());
        match (validate_structure(&node, "engine.audio", "prepare"), problem) {
            (Ok(()), None) => {}
            (Err(err), Some(expected)) => {
                assert_eq!(err.code, ErrorCode::InvalidInput);
                assert!(err.message.starts_with(expected), "{}", err.message);
                assert_eq!(err.context.location, "engine.audio");
            }
            (got, want) => panic!("got {got:?}, expected problem {want:?}"),
        }
    }

    #[test]
    fn check_structure_renders_flow_error() {
        let node = JobNode::with_id(JobId::from_digest([1; 32]), "engine.audio", "prepare", Vec::new());
        let result = check_structure(&node, "engine.audio", "prepare").unwrap_err();
        assert_eq!(result.status, JobResultStatus::InvalidInput);
        assert!(result.engine_message.starts_with("Error{code=1001, severity=Error"));
    }
}
