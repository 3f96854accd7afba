//! Streaming render/resample core for offline trajectory processing.
//!
//! A render job reads transmitter trajectories block by block, optionally
//! converts their sample rate, derives receiver sensitivities and hands the
//! blocks to a producer plug-in, which may in turn feed a consumer that
//! splices the result back into trajectory storage.

pub mod math;
pub mod plugins;
pub mod prelude;
pub mod render;
pub mod telemetry;

pub use math::span::Span;
pub use prelude::{RenderError, RenderOutcome, RenderPlugin, RenderResult};
pub use render::{RenderContext, RenderDriver, RenderSource};
