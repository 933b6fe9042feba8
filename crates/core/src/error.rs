use crate::compiler::CompilerError;
use crate::validation::ValidationError;
use crate::workspace::WorkspaceWriteError;

/// Every way a compilation job can fail, in pipeline order.
///
/// Each variant renders the caller-facing message directly, so the HTTP layer
/// only has to pick a status code.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The request was rejected before any side effect happened.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One of the workspace files could not be written.
    #[error(transparent)]
    WorkspaceWrite(#[from] WorkspaceWriteError),

    /// The compiler could not be spawned, failed, or timed out.
    #[error(transparent)]
    Compiler(#[from] CompilerError),
}
