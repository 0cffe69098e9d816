// Operation execution: runs the phases of one operation and routes its response

use crate::operation::{Operation, OperationResult};
use crate::wire::ResultValue;

/// Runs operations on the current task.
#[derive(Debug, Clone, Default)]
pub struct OperationService;

impl OperationService {
    pub fn new() -> Self {
        Self
    }

    /// Run `before_run`, `run` and `after_run`, then deliver the response.
    ///
    /// A failing operation that returns a response still answers, with
    /// `ResultValue::Error`, so whoever waits on it is never left hanging.
    pub async fn run_operation(&self, mut op: Box<dyn Operation>) {
        let outcome = Self::run_phases(op.as_mut()).await;
        let partition = op.context().partition_id();

        if !op.returns_response() {
            if let Err(e) = outcome {
                tracing::error!(
                    partition = ?partition,
                    factory_id = op.factory_id(),
                    "Operation failed: {}",
                    e
                );
            }
            return;
        }

        let response = match outcome {
            Ok(()) => op.response(),
            Err(e) => {
                tracing::error!(
                    partition = ?partition,
                    factory_id = op.factory_id(),
                    "Operation failed: {}",
                    e
                );
                ResultValue::Error(e.to_string())
            }
        };

        match op.context().response_handler() {
            Some(handler) => {
                if let Err(e) = handler.send_response(response) {
                    tracing::debug!(partition = ?partition, "Response not delivered: {}", e);
                }
            }
            None => tracing::warn!(
                partition = ?partition,
                factory_id = op.factory_id(),
                "Operation has no response handler, dropping its response"
            ),
        }
    }

    async fn run_phases(op: &mut dyn Operation) -> OperationResult<()> {
        op.before_run().await?;
        op.run().await?;
        op.after_run().await
    }
}
