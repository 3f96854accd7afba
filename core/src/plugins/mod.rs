//! Built-in producers and consumers.

pub mod bounce;
pub mod filter;
pub mod replace;

pub use bounce::{SenseBounce, SenseStream, SenseSummary, SenseTable};
pub use filter::{PointTransform, TrajectoryFilter};
pub use replace::TrajectoryReplace;

use crate::prelude::RenderPlugin;
use crate::render::blend::BlendCurve;
use crate::render::context::ConsumerKind;

/// Instantiates a consumer by kind.
pub fn consumer_for(
    kind: ConsumerKind,
    blend_len: i64,
    curve: BlendCurve,
) -> Box<dyn RenderPlugin> {
    match kind {
        ConsumerKind::TrajectoryReplace => Box::new(TrajectoryReplace::new(blend_len, curve)),
    }
}
