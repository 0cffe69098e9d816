//! Operations: self-contained, serializable units of work addressed to one partition.
//!
//! An operation is decoded fresh from a [`Data`](crate::wire::Data) template
//! through the [`OperationRegistry`], stamped with an [`OperationContext`] and
//! handed to the operation service, which runs its phases and delivers its
//! response through the stamped response sink.

mod context;
mod error;
mod header;
mod multiply;
mod registry;

pub use context::OperationContext;
pub use error::{OperationError, OperationResult};
pub use header::OperationHeader;
pub use multiply::MultiplyPartitionOperation;
pub use registry::{OperationConstructor, OperationRegistry};

use std::future::Future;
use std::pin::Pin;

use crate::wire::{ObjectDataInput, ObjectDataOutput, ResultValue, WireResult};

/// Future returned by the run phases of an operation.
pub type OperationFuture<'a> = Pin<Box<dyn Future<Output = OperationResult<()>> + Send + 'a>>;

/// A polymorphic unit of work.
///
/// Implementations hold their own parameters and result; everything that
/// depends on where and for whom they run lives in the context.
pub trait Operation: Send + 'static {
    /// Type id under which the operation's constructor is registered.
    fn factory_id(&self) -> i32;

    fn context(&self) -> &OperationContext;

    fn context_mut(&mut self) -> &mut OperationContext;

    fn before_run(&mut self) -> OperationFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn run(&mut self) -> OperationFuture<'_>;

    fn after_run(&mut self) -> OperationFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    /// Whether the caller waits for `response()`.
    fn returns_response(&self) -> bool {
        true
    }

    fn response(&self) -> ResultValue;

    /// Write the operation-specific fields.
    fn write_internal(&self, out: &mut ObjectDataOutput) -> WireResult<()>;

    /// Read the operation-specific fields into a freshly constructed instance.
    fn read_internal(&mut self, input: &mut ObjectDataInput) -> WireResult<()>;
}
