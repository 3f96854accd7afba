use crate::math::span::Span;
use crate::prelude::{RenderError, RenderOutcome, RenderPlugin, RenderResult};
use crate::render::buffer_pool::BufferPool;
use crate::render::context::RenderContext;
use crate::render::host::RenderHost;
use crate::render::resample::{Resampler, SincResampler};
use crate::render::source::RenderSource;
use crate::telemetry::log::{LogManager, MessageLevel};
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;

const BUFFERS_PER_CHANNEL: usize = 6;

/// Block geometry negotiated for one job.
///
/// The producer always receives `block_len` frames per block, except for
/// the last block. Resampling runs in steps of `inside_len` new input
/// frames; their output is queued until a full block is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockPlan {
    pub factor: f64,
    pub resampling: bool,
    pub block_len: usize,
    /// Kernel half-width plus one guard sample.
    pub wing_size: usize,
    pub overlap_len: usize,
    pub overlap_offset: usize,
    pub inside_len: usize,
    pub input_len: usize,
    /// Upper bound on the frames produced by one resampling step.
    pub output_len: usize,
}

impl BlockPlan {
    pub fn new(factor: f64, block_len: usize, resampler: &dyn Resampler) -> RenderResult<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(RenderError::invalid(format!(
                "resampling factor {} is not usable",
                factor
            )));
        }
        let block_len = block_len.max(1);

        if factor == 1.0 {
            return Ok(Self {
                factor,
                resampling: false,
                block_len,
                wing_size: 0,
                overlap_len: 0,
                overlap_offset: block_len,
                inside_len: block_len,
                input_len: block_len,
                output_len: block_len,
            });
        }

        let wing_size = resampler.wing_size(factor).ceil() as usize + 1;
        let overlap_len = 2 * wing_size;
        // A step must advance at least 1/f input frames to emit a frame.
        let min_inside = (1.0 / factor).ceil() as usize;
        let (inside_len, output_len) = if factor > 1.0 {
            let inside_len = ((block_len as f64 / factor).floor() as usize).max(min_inside);
            let most = (inside_len as f64 * factor).ceil() as usize;
            (inside_len, block_len.max(most))
        } else {
            let inside_len = (((block_len - 1) as f64 / factor).ceil() as usize)
                .max(min_inside)
                .max(wing_size);
            (inside_len, (inside_len as f64 * factor).floor() as usize + 1)
        };
        let input_len = inside_len + overlap_len;

        Ok(Self {
            factor,
            resampling: true,
            block_len,
            wing_size,
            overlap_len,
            overlap_offset: input_len - overlap_len,
            inside_len,
            input_len,
            output_len,
        })
    }

    /// Number of output frames produced from `input_frames` source frames.
    pub fn total_output(&self, input_frames: usize) -> usize {
        if self.resampling {
            (input_frames as f64 * self.factor).ceil() as usize
        } else {
            input_frames
        }
    }

    /// Input frames, relative to the job start, whose instants fall inside
    /// the output frames `[out_offset, out_offset + len)`.
    pub fn input_span(&self, out_offset: usize, len: usize, input_frames: usize) -> Span {
        if !self.resampling {
            return Span::with_len(out_offset as i64, len as i64);
        }
        let at = |out: usize| ((out as f64 / self.factor).ceil() as usize).min(input_frames);
        let start = at(out_offset);
        let stop = at(out_offset + len);
        Span::with_len(start as i64, (stop - start) as i64)
    }
}

/// Input, history and queued output of one transmitter.
struct Channel {
    frames: Vec<[f32; 2]>,
    x: Vec<f32>,
    y: Vec<f32>,
    history_x: Vec<f32>,
    history_y: Vec<f32>,
    out_x: Vec<f32>,
    out_y: Vec<f32>,
    pending: Vec<[f32; 2]>,
}

impl Channel {
    fn checkout(pool: &mut BufferPool, plan: &BlockPlan) -> RenderResult<Self> {
        Ok(Self {
            frames: vec![[0.0; 2]; plan.input_len],
            x: pool.checkout(plan.input_len)?,
            y: pool.checkout(plan.input_len)?,
            history_x: pool.checkout(plan.overlap_len)?,
            history_y: pool.checkout(plan.overlap_len)?,
            out_x: pool.checkout(plan.output_len)?,
            out_y: pool.checkout(plan.output_len)?,
            pending: Vec::with_capacity(plan.block_len + plan.output_len),
        })
    }

    fn release(self, pool: &mut BufferPool) {
        for buffer in [
            self.x,
            self.y,
            self.history_x,
            self.history_y,
            self.out_x,
            self.out_y,
        ] {
            pool.release(buffer);
        }
    }

    /// Moves the frames read at `offset` into the x/y channels.
    ///
    /// The unread head of the first step and the unread tail of a short
    /// read hold the nearest read frame instead of being zero-filled, so
    /// the kernel sees a flat signal past both ends of the span rather
    /// than a jump to the origin.
    fn split(&mut self, offset: usize, read_len: usize, hold_head: bool) {
        let stop = offset + read_len;
        for i in offset..stop {
            self.x[i] = self.frames[i][0];
            self.y[i] = self.frames[i][1];
        }
        if hold_head && offset > 0 {
            let (hx, hy) = (self.x[offset], self.y[offset]);
            self.x[..offset].fill(hx);
            self.y[..offset].fill(hy);
        }
        if stop > 0 && stop < self.x.len() {
            let (tx, ty) = (self.x[stop - 1], self.y[stop - 1]);
            self.x[stop..].fill(tx);
            self.y[stop..].fill(ty);
        }
    }
}

/// Position of the resampling steps within the job.
struct StepCursor {
    remaining_input: usize,
    read_start: i64,
    resampled: usize,
    in_offset: usize,
    in_phase: f64,
    first: bool,
}

/// Runs render jobs: streams trajectory blocks through the optional
/// resampler to a producer plug-in.
pub struct RenderDriver {
    host: Arc<dyn RenderHost>,
    resampler: Box<dyn Resampler>,
    metrics: Arc<MetricsRecorder>,
    pool: BufferPool,
    logger: LogManager,
}

impl RenderDriver {
    pub fn new(host: Arc<dyn RenderHost>) -> Self {
        Self {
            host,
            resampler: Box::new(SincResampler::default()),
            metrics: Arc::new(MetricsRecorder::new()),
            pool: BufferPool::with_capacity(BUFFERS_PER_CHANNEL),
            logger: LogManager::for_target("driver"),
        }
    }

    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = resampler;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    /// Runs one job to completion, cancellation or failure.
    ///
    /// Cancellation through the host is reported as
    /// `Ok(RenderOutcome::Cancelled)`. Every path other than completion
    /// ends with `producer.cancel`.
    pub fn run(
        &mut self,
        context: &mut RenderContext,
        producer: &mut dyn RenderPlugin,
    ) -> RenderResult<RenderOutcome> {
        let mut source = RenderSource::new(context.transmitters().len(), context.receivers().len());

        let result = self.stream(context, &mut source, producer);
        match &result {
            Ok(RenderOutcome::Completed) => {
                self.metrics.record_completed();
                self.logger.record("render job completed");
            }
            Ok(RenderOutcome::Cancelled) => {
                producer.cancel(context, &mut source);
                self.metrics.record_cancelled();
                self.host
                    .show_message(MessageLevel::Info, "render job cancelled");
            }
            Err(err) => {
                producer.cancel(context, &mut source);
                self.metrics.record_failed();
                if err.is_logical_abort() {
                    self.logger
                        .record_at(MessageLevel::Warning, &format!("render job {}", err));
                } else {
                    self.host
                        .show_message(MessageLevel::Error, &format!("render job failed: {}", err));
                }
            }
        }
        result
    }

    fn stream(
        &mut self,
        context: &mut RenderContext,
        source: &mut RenderSource,
        producer: &mut dyn RenderPlugin,
    ) -> RenderResult<RenderOutcome> {
        if !producer.begin(context, source)? {
            return Err(RenderError::Aborted("begin"));
        }
        source.freeze_requests();

        let dirty = context.take_dirty_options();
        if !dirty.is_empty() {
            self.logger
                .record_at(MessageLevel::Debug, &format!("producer set options {:?}", dirty));
        }
        let sizes = context.block_sizes();
        sizes.validate()?;
        let plan = BlockPlan::new(
            context.resample_factor(),
            sizes.effective(),
            self.resampler.as_ref(),
        )?;
        self.logger.record(&format!(
            "factor {:.4} block {} step in {} out {} overlap {}",
            plan.factor, plan.block_len, plan.input_len, plan.output_len, plan.overlap_len
        ));

        let num_transmitters = source.num_transmitters();
        self.pool.reserve(num_transmitters * BUFFERS_PER_CHANNEL);
        let mut channels = Vec::with_capacity(num_transmitters);
        for trns in 0..num_transmitters {
            let channel = if source.has_request(trns) {
                Some(Channel::checkout(&mut self.pool, &plan)?)
            } else {
                None
            };
            channels.push(channel);
        }
        source.allocate(plan.block_len);

        let outcome = self.stream_blocks(context, source, producer, &plan, &mut channels);
        for channel in channels.into_iter().flatten() {
            channel.release(&mut self.pool);
        }

        if outcome? == RenderOutcome::Cancelled {
            return Ok(RenderOutcome::Cancelled);
        }
        if !producer.finish(context, source)? {
            return Err(RenderError::Aborted("finish"));
        }
        Ok(RenderOutcome::Completed)
    }

    fn stream_blocks(
        &self,
        context: &mut RenderContext,
        source: &mut RenderSource,
        producer: &mut dyn RenderPlugin,
        plan: &BlockPlan,
        channels: &mut [Option<Channel>],
    ) -> RenderResult<RenderOutcome> {
        let time_span = context.time_span();
        let total_input = time_span.len() as usize;
        let total_output = plan.total_output(total_input);

        let mut cursor = StepCursor {
            remaining_input: total_input,
            read_start: time_span.start(),
            resampled: 0,
            in_offset: plan.wing_size,
            in_phase: 0.0,
            first: true,
        };
        let mut written = 0usize;

        while written < total_output {
            if !self.host.is_running() {
                return Ok(RenderOutcome::Cancelled);
            }

            let block_len = plan.block_len.min(total_output - written);
            while cursor.resampled - written < block_len {
                self.step(context, plan, channels, &mut cursor, total_output)?;
            }

            for (trns, slot) in channels.iter_mut().enumerate() {
                let Some(channel) = slot.as_mut() else {
                    continue;
                };
                if let Some(buf) = source.trajectory_mut(trns) {
                    buf[..block_len].copy_from_slice(&channel.pending[..block_len]);
                }
                for (rcv, receiver) in context.receivers().iter().enumerate() {
                    if let Some(buf) = source.sense_mut(trns, rcv) {
                        receiver.sensitivities(&channel.pending, buf, 0, block_len, 1);
                    }
                }
                channel.pending.drain(..block_len);
            }

            source.block_span = plan
                .input_span(written, block_len, total_input)
                .shift(time_span.start());
            source.block_offset = written;
            source.block_len = block_len;
            if !producer.render(context, source)? {
                return Err(RenderError::Aborted("render"));
            }
            self.metrics.record_block(block_len);

            written += block_len;
            self.host
                .set_progression(written as f32 / total_output as f32);
        }

        Ok(RenderOutcome::Completed)
    }

    /// Reads the next input step of every channel and queues its output.
    fn step(
        &self,
        context: &RenderContext,
        plan: &BlockPlan,
        channels: &mut [Option<Channel>],
        cursor: &mut StepCursor,
        total_output: usize,
    ) -> RenderResult<()> {
        let read_len = (plan.input_len - cursor.in_offset).min(cursor.remaining_input);
        let write_len = if plan.resampling {
            let inside = (plan.inside_len as f64 - cursor.in_phase) * plan.factor;
            (inside.ceil() as usize).min(total_output - cursor.resampled)
        } else {
            read_len
        };
        if write_len == 0 {
            return Err(RenderError::Internal(format!(
                "resampling step at frame {} produced no output",
                cursor.read_start
            )));
        }
        let span = Span::with_len(cursor.read_start, read_len as i64);

        for (trns, slot) in channels.iter_mut().enumerate() {
            let Some(channel) = slot.as_mut() else {
                continue;
            };
            if read_len > 0 {
                context.transmitters()[trns]
                    .track
                    .read(span, &mut channel.frames, cursor.in_offset)?;
            }

            if plan.resampling {
                channel.x[..plan.overlap_len].copy_from_slice(&channel.history_x);
                channel.y[..plan.overlap_len].copy_from_slice(&channel.history_y);
                channel.split(cursor.in_offset, read_len, cursor.first);

                let read_pos = plan.wing_size as f64 + cursor.in_phase;
                self.resampler
                    .resample(&channel.x, read_pos, &mut channel.out_x, 0, write_len, plan.factor);
                self.resampler
                    .resample(&channel.y, read_pos, &mut channel.out_y, 0, write_len, plan.factor);
                channel
                    .history_x
                    .copy_from_slice(&channel.x[plan.overlap_offset..]);
                channel
                    .history_y
                    .copy_from_slice(&channel.y[plan.overlap_offset..]);

                let (out_x, out_y) = (&channel.out_x, &channel.out_y);
                channel
                    .pending
                    .extend((0..write_len).map(|i| [out_x[i], out_y[i]]));
            } else {
                channel
                    .pending
                    .extend_from_slice(&channel.frames[..write_len]);
            }
        }

        cursor.resampled += write_len;
        cursor.remaining_input -= read_len;
        cursor.read_start += read_len as i64;
        if plan.resampling {
            cursor.in_offset = plan.overlap_len;
            cursor.in_phase =
                cursor.in_phase + write_len as f64 / plan.factor - plan.inside_len as f64;
        }
        cursor.first = false;
        Ok(())
    }
}
