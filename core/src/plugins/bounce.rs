use crate::math::stats::StatsHelper;
use crate::prelude::{RenderError, RenderPlugin, RenderResult};
use crate::render::context::RenderContext;
use crate::render::source::RenderSource;
use crate::telemetry::log::LogManager;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Sensitivity signal of one transmitter/receiver pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenseStream {
    pub transmitter: String,
    pub receiver: String,
    #[serde(skip)]
    pub trns: usize,
    #[serde(skip)]
    pub rcv: usize,
    pub samples: Vec<f32>,
}

/// Condensed view of a stream for reports.
#[derive(Debug, Clone, Serialize)]
pub struct SenseSummary {
    pub transmitter: String,
    pub receiver: String,
    pub frames: usize,
    pub rms: f32,
    pub peak: f32,
}

/// Sensitivities gathered by [`SenseBounce`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenseTable {
    pub rate: f64,
    pub complete: bool,
    pub streams: Vec<SenseStream>,
}

impl SenseTable {
    pub fn summary(&self) -> Vec<SenseSummary> {
        self.streams
            .iter()
            .map(|stream| SenseSummary {
                transmitter: stream.transmitter.clone(),
                receiver: stream.receiver.clone(),
                frames: stream.samples.len(),
                rms: StatsHelper::rms(&stream.samples),
                peak: StatsHelper::peak(&stream.samples),
            })
            .collect()
    }

    pub fn to_json(&self) -> RenderResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| RenderError::Internal(err.to_string()))
    }
}

/// Producer that renders receiver sensitivities, optionally at another rate.
pub struct SenseBounce {
    pairs: Option<Vec<(usize, usize)>>,
    target_rate: Option<f64>,
    pref_block_size: Option<usize>,
    table: Arc<Mutex<SenseTable>>,
    logger: LogManager,
}

impl SenseBounce {
    /// Bounces every transmitter/receiver pair at the source rate.
    pub fn new() -> Self {
        Self {
            pairs: None,
            target_rate: None,
            pref_block_size: None,
            table: Arc::new(Mutex::new(SenseTable::default())),
            logger: LogManager::for_target("bounce"),
        }
    }

    pub fn with_pairs(mut self, pairs: Vec<(usize, usize)>) -> Self {
        self.pairs = Some(pairs);
        self
    }

    pub fn with_target_rate(mut self, rate: Option<f64>) -> Self {
        self.target_rate = rate;
        self
    }

    pub fn with_pref_block_size(mut self, size: usize) -> Self {
        self.pref_block_size = Some(size);
        self
    }

    /// Shared handle to the collected table, readable after the job.
    pub fn table(&self) -> Arc<Mutex<SenseTable>> {
        self.table.clone()
    }

    fn lock(&self) -> RenderResult<std::sync::MutexGuard<'_, SenseTable>> {
        self.table
            .lock()
            .map_err(|_| RenderError::Internal("sense table lock poisoned".into()))
    }
}

impl Default for SenseBounce {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPlugin for SenseBounce {
    fn begin(
        &mut self,
        context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let pairs = match &self.pairs {
            Some(pairs) => pairs.clone(),
            None => (0..source.num_transmitters())
                .flat_map(|trns| (0..source.num_receivers()).map(move |rcv| (trns, rcv)))
                .collect(),
        };
        if pairs.is_empty() {
            self.logger.record("nothing to bounce");
            return Ok(false);
        }

        let mut streams = Vec::with_capacity(pairs.len());
        for &(trns, rcv) in &pairs {
            source.request_sense(trns, rcv)?;
            streams.push(SenseStream {
                transmitter: context.transmitters()[trns].name.clone(),
                receiver: context.receivers()[rcv].name().to_string(),
                trns,
                rcv,
                samples: Vec::new(),
            });
        }
        if self.target_rate.is_some() {
            context.set_target_rate(self.target_rate);
        }
        if let Some(size) = self.pref_block_size {
            context.set_pref_block_size(size);
        }

        let mut table = self.lock()?;
        *table = SenseTable {
            rate: context.target_rate().unwrap_or(context.source_rate()),
            complete: false,
            streams,
        };
        Ok(true)
    }

    fn render(
        &mut self,
        _context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let mut table = self.lock()?;
        for stream in table.streams.iter_mut() {
            if let Some(sense) = source.sense(stream.trns, stream.rcv) {
                stream.samples.extend_from_slice(sense);
            }
        }
        Ok(true)
    }

    fn finish(
        &mut self,
        _context: &mut RenderContext,
        _source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let mut table = self.lock()?;
        table.complete = true;
        let frames = table.streams.first().map_or(0, |s| s.samples.len());
        drop(table);
        self.logger
            .record(&format!("bounced {} frames per stream", frames));
        Ok(true)
    }

    fn cancel(&mut self, _context: &mut RenderContext, _source: &mut RenderSource) {
        if let Ok(mut table) = self.table.lock() {
            table.complete = false;
            for stream in table.streams.iter_mut() {
                stream.samples.clear();
            }
        }
    }
}
