pub mod kernel;
pub mod span;
pub mod stats;

pub use kernel::KernelHelper;
pub use span::Span;
pub use stats::StatsHelper;
