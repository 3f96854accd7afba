pub mod blend;
pub mod buffer_pool;
pub mod context;
pub mod driver;
pub mod host;
pub mod receiver;
pub mod resample;
pub mod source;
pub mod track;

pub use blend::{BlendContext, BlendCurve};
pub use buffer_pool::BufferPool;
pub use context::{
    BlockSizes, ConsumerKind, OptionKey, ProducerKind, RenderContext, RenderOptions, Transmitter,
};
pub use driver::{BlockPlan, RenderDriver};
pub use host::{CancelToken, LogHost, RenderHost};
pub use receiver::{CircleReceiver, Receiver, SectorReceiver};
pub use resample::{LinearResampler, Resampler, ResamplerQuality, SincResampler};
pub use source::RenderSource;
pub use track::{EditOp, MemoryTrack, Stake, TrackEdit, TrackReader, TrackStore};
