use thiserror::Error;

/// Errors raised while stopping the controller.
///
/// Per-iteration failures inside the running loops are logged and never
/// surface here.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A loop task panicked
    #[error("Task {task} panicked: {message}")]
    TaskPanicked { task: &'static str, message: String },
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
