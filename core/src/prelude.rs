use crate::render::context::RenderContext;
use crate::render::source::RenderSource;

/// Common error type for render jobs.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Read or write failure on trajectory storage.
    #[error("i/o failure: {0}")]
    Io(String),
    /// A plug-in declined to continue (`begin`, `render` or `finish` returned `false`).
    #[error("aborted during {0}")]
    Aborted(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl RenderError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Logical aborts are expected outcomes and are not reported as faults.
    pub fn is_logical_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Lifecycle shared by producers and consumers driven block by block.
///
/// `begin`, `render` and `finish` return `Ok(false)` to abort the job
/// without raising an error. `cancel` may be called at any point, more
/// than once, and even when `begin` never completed.
pub trait RenderPlugin {
    fn begin(&mut self, context: &mut RenderContext, source: &mut RenderSource)
        -> RenderResult<bool>;
    fn render(&mut self, context: &mut RenderContext, source: &mut RenderSource)
        -> RenderResult<bool>;
    fn finish(&mut self, context: &mut RenderContext, source: &mut RenderSource)
        -> RenderResult<bool>;
    fn cancel(&mut self, context: &mut RenderContext, source: &mut RenderSource);
}

/// How a job that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
}
