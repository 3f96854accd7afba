use crate::math::span::Span;
use crate::prelude::{RenderError, RenderResult};
use crate::render::receiver::Receiver;
use crate::render::track::TrackStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const DEFAULT_MIN_BLOCK_SIZE: usize = 1;
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1 << 23;
pub const DEFAULT_PREF_BLOCK_SIZE: usize = 1024;

/// Keys of the negotiable render options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionKey {
    TargetRate,
    MinBlockSize,
    MaxBlockSize,
    PrefBlockSize,
    Consumer,
    Plugin,
}

/// Built-in producers a job can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerKind {
    TrajectoryFilter,
    SenseBounce,
}

/// Built-in consumers a producer can hand its output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    TrajectoryReplace,
}

/// Block-size bounds negotiated between the driver and the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSizes {
    pub min: usize,
    pub max: usize,
    pub pref: usize,
}

impl Default for BlockSizes {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_BLOCK_SIZE,
            max: DEFAULT_MAX_BLOCK_SIZE,
            pref: DEFAULT_PREF_BLOCK_SIZE,
        }
    }
}

impl BlockSizes {
    pub fn validate(&self) -> RenderResult<()> {
        if self.min == 0 || self.min > self.max {
            return Err(RenderError::invalid(format!(
                "block size bounds [{}, {}] are not a valid range",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Preferred size clamped into `[min, max]`.
    pub fn effective(&self) -> usize {
        self.pref.clamp(self.min, self.max)
    }
}

/// Typed option set of a render job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub target_rate: Option<f64>,
    pub block_sizes: BlockSizes,
    pub consumer: Option<ConsumerKind>,
    pub plugin: Option<ProducerKind>,
}

/// A transmitter is a named moving point backed by a trajectory track.
#[derive(Clone)]
pub struct Transmitter {
    pub name: String,
    pub track: Arc<dyn TrackStore>,
}

impl Transmitter {
    pub fn new(name: impl Into<String>, track: Arc<dyn TrackStore>) -> Self {
        Self {
            name: name.into(),
            track,
        }
    }
}

/// Configuration of one render job.
pub struct RenderContext {
    time_span: Span,
    source_rate: f64,
    transmitters: Vec<Transmitter>,
    receivers: Vec<Arc<dyn Receiver>>,
    options: RenderOptions,
    dirty: BTreeSet<OptionKey>,
}

impl RenderContext {
    pub fn new(
        time_span: Span,
        source_rate: f64,
        transmitters: Vec<Transmitter>,
        receivers: Vec<Arc<dyn Receiver>>,
    ) -> RenderResult<Self> {
        if !(source_rate.is_finite() && source_rate > 0.0) {
            return Err(RenderError::invalid(format!(
                "source rate {} must be positive",
                source_rate
            )));
        }
        Ok(Self {
            time_span,
            source_rate,
            transmitters,
            receivers,
            options: RenderOptions::default(),
            dirty: BTreeSet::new(),
        })
    }

    pub fn time_span(&self) -> Span {
        self.time_span
    }

    pub fn source_rate(&self) -> f64 {
        self.source_rate
    }

    pub fn transmitters(&self) -> &[Transmitter] {
        &self.transmitters
    }

    pub fn receivers(&self) -> &[Arc<dyn Receiver>] {
        &self.receivers
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn target_rate(&self) -> Option<f64> {
        self.options.target_rate
    }

    pub fn set_target_rate(&mut self, rate: Option<f64>) {
        self.options.target_rate = rate;
        self.dirty.insert(OptionKey::TargetRate);
    }

    pub fn block_sizes(&self) -> BlockSizes {
        self.options.block_sizes
    }

    pub fn set_min_block_size(&mut self, size: usize) {
        self.options.block_sizes.min = size;
        self.dirty.insert(OptionKey::MinBlockSize);
    }

    pub fn set_max_block_size(&mut self, size: usize) {
        self.options.block_sizes.max = size;
        self.dirty.insert(OptionKey::MaxBlockSize);
    }

    pub fn set_pref_block_size(&mut self, size: usize) {
        self.options.block_sizes.pref = size;
        self.dirty.insert(OptionKey::PrefBlockSize);
    }

    pub fn set_block_sizes(&mut self, sizes: BlockSizes) {
        self.set_min_block_size(sizes.min);
        self.set_max_block_size(sizes.max);
        self.set_pref_block_size(sizes.pref);
    }

    pub fn consumer(&self) -> Option<ConsumerKind> {
        self.options.consumer
    }

    pub fn set_consumer(&mut self, consumer: Option<ConsumerKind>) {
        self.options.consumer = consumer;
        self.dirty.insert(OptionKey::Consumer);
    }

    pub fn plugin(&self) -> Option<ProducerKind> {
        self.options.plugin
    }

    pub fn set_plugin(&mut self, plugin: Option<ProducerKind>) {
        self.options.plugin = plugin;
        self.dirty.insert(OptionKey::Plugin);
    }

    /// Returns the keys modified since the last call and clears the set.
    pub fn take_dirty_options(&mut self) -> BTreeSet<OptionKey> {
        std::mem::take(&mut self.dirty)
    }

    /// Ratio of target to source rate, `1.0` when no target rate is set.
    pub fn resample_factor(&self) -> f64 {
        match self.options.target_rate {
            Some(rate) if rate > 0.0 => rate / self.source_rate,
            _ => 1.0,
        }
    }
}
