use crate::error::BatchError;

use super::execution::ExecutionContext;

/// Result of a single read: an item, `None` at end of input, or an error.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Retrieves input one item at a time.
///
/// Implementations are pull based and forward only: each call to `read` returns the next
/// item, `Ok(None)` once the input is exhausted, or the error that prevented the read.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Lifecycle of a stateful reader.
///
/// `open` acquires whatever the reader needs, `update` lets the reader record its
/// position in the [`ExecutionContext`] and `close` releases everything.
pub trait ItemStream {
    fn open(&self, _execution_context: &ExecutionContext) -> Result<(), BatchError> {
        Ok(())
    }
    fn update(&self, _execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        Ok(())
    }
    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}
