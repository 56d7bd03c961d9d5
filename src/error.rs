use thiserror::Error;

/// Failures reported by a [`HeapSource`](crate::HeapSource).
///
/// The public allocator operations translate these into their null-pointer
/// failure signal; the type is exposed so alternative sources can report
/// meaningful exhaustion diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The operating system refused to move the program break.
  #[error("program break could not be moved by {0} bytes")]
  BreakFailed(usize),

  /// A fixed-capacity source ran out of room.
  #[error("heap exhausted: requested {requested} bytes, {available} available")]
  Exhausted { requested: usize, available: usize },
}
