use crate::math::span::Span;
use crate::prelude::{RenderPlugin, RenderResult};
use crate::render::context::RenderContext;
use crate::render::source::RenderSource;
use crate::render::track::{MemoryTrack, TrackEdit, TrackReader, TrackStore};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

/// Affine point transformation applied by [`TrajectoryFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointTransform {
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32, center: [f32; 2] },
    /// Counter-clockwise rotation in radians.
    Rotate { angle: f32, center: [f32; 2] },
}

impl PointTransform {
    pub fn apply(&self, point: [f32; 2]) -> [f32; 2] {
        match *self {
            PointTransform::Translate { dx, dy } => [point[0] + dx, point[1] + dy],
            PointTransform::Scale { sx, sy, center } => [
                center[0] + (point[0] - center[0]) * sx,
                center[1] + (point[1] - center[1]) * sy,
            ],
            PointTransform::Rotate { angle, center } => {
                let (sin, cos) = angle.sin_cos();
                let dx = point[0] - center[0];
                let dy = point[1] - center[1];
                [center[0] + dx * cos - dy * sin, center[1] + dx * sin + dy * cos]
            }
        }
    }
}

/// Producer that transforms every transmitter's trajectory.
///
/// Transformed blocks go to scratch tracks while the driver is still
/// reading the originals. An attached consumer only sees the data in a
/// second pass started from `finish`, so it may safely write back into
/// the tracks that were just read.
pub struct TrajectoryFilter {
    transform: PointTransform,
    consumer: Option<Box<dyn RenderPlugin>>,
    consumer_source: Option<RenderSource>,
    scratch: Vec<MemoryTrack>,
    logger: LogManager,
}

impl TrajectoryFilter {
    pub fn new(transform: PointTransform) -> Self {
        Self {
            transform,
            consumer: None,
            consumer_source: None,
            scratch: Vec::new(),
            logger: LogManager::for_target("filter"),
        }
    }

    pub fn with_consumer(mut self, consumer: Box<dyn RenderPlugin>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Transformed frames of one transmitter, as collected so far.
    pub fn scratch_frames(&self, trns: usize) -> RenderResult<Vec<[f32; 2]>> {
        match self.scratch.get(trns) {
            Some(track) => track.snapshot(),
            None => Ok(Vec::new()),
        }
    }

    fn replay(&mut self, context: &mut RenderContext) -> RenderResult<bool> {
        let Some(consumer) = self.consumer.as_mut() else {
            return Ok(true);
        };
        let source = self
            .consumer_source
            .insert(RenderSource::new(context.transmitters().len(), context.receivers().len()));
        source.request_all_trajectories()?;
        if !consumer.begin(context, source)? {
            return Ok(false);
        }
        source.freeze_requests();

        let block = context.block_sizes().effective();
        source.allocate(block);
        let span = context.time_span();
        let total = span.len() as usize;
        let mut offset = 0usize;
        while offset < total {
            let len = block.min(total - offset);
            let rel = Span::with_len(offset as i64, len as i64);
            for (trns, track) in self.scratch.iter().enumerate() {
                if let Some(buf) = source.trajectory_mut(trns) {
                    track.read(rel, buf, 0)?;
                }
            }
            source.block_span = rel.shift(span.start());
            source.block_offset = offset;
            source.block_len = len;
            if !consumer.render(context, source)? {
                return Ok(false);
            }
            offset += len;
        }

        let done = consumer.finish(context, source)?;
        if done {
            self.consumer_source = None;
        }
        Ok(done)
    }
}

impl RenderPlugin for TrajectoryFilter {
    fn begin(
        &mut self,
        context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        source.request_all_trajectories()?;
        if context.target_rate().is_some() {
            context.set_target_rate(None);
        }
        self.scratch = (0..source.num_transmitters())
            .map(|_| MemoryTrack::default())
            .collect();
        self.consumer_source = None;
        Ok(true)
    }

    fn render(
        &mut self,
        _context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let span = Span::with_len(source.block_offset as i64, source.block_len as i64);
        for (trns, track) in self.scratch.iter().enumerate() {
            let Some(frames) = source.trajectory(trns) else {
                continue;
            };
            let mut stake = track.alloc(span)?;
            let transformed: Vec<[f32; 2]> =
                frames.iter().map(|&point| self.transform.apply(point)).collect();
            stake.write_frames(&transformed, 0, span)?;

            let mut edit = TrackEdit::begin("filter scratch");
            edit.add(stake);
            edit.perform(track)?;
        }
        Ok(true)
    }

    fn finish(
        &mut self,
        context: &mut RenderContext,
        _source: &mut RenderSource,
    ) -> RenderResult<bool> {
        self.logger.record(&format!(
            "filtered {} transmitters over {:?}",
            self.scratch.len(),
            context.time_span()
        ));
        self.replay(context)
    }

    fn cancel(&mut self, context: &mut RenderContext, _source: &mut RenderSource) {
        if let (Some(consumer), Some(mut source)) =
            (self.consumer.as_mut(), self.consumer_source.take())
        {
            consumer.cancel(context, &mut source);
        }
        self.scratch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5
    }

    #[test]
    fn transforms_move_points() {
        let shift = PointTransform::Translate { dx: 1.0, dy: -2.0 };
        assert_eq!(shift.apply([1.0, 1.0]), [2.0, -1.0]);

        let scale = PointTransform::Scale {
            sx: 2.0,
            sy: 0.5,
            center: [1.0, 1.0],
        };
        assert_eq!(scale.apply([2.0, 3.0]), [3.0, 2.0]);

        let rotate = PointTransform::Rotate {
            angle: FRAC_PI_2,
            center: [0.0, 0.0],
        };
        assert!(close(rotate.apply([1.0, 0.0]), [0.0, 1.0]));
    }

    #[test]
    fn transform_reads_from_yaml_style_tags() {
        let parsed: PointTransform =
            serde_json::from_str(r#"{"kind":"translate","dx":0.5,"dy":1.5}"#).unwrap();
        assert_eq!(parsed, PointTransform::Translate { dx: 0.5, dy: 1.5 });
    }
}
