use crate::math::span::Span;
use crate::prelude::{RenderPlugin, RenderResult};
use crate::render::blend::{BlendContext, BlendCurve};
use crate::render::context::RenderContext;
use crate::render::source::RenderSource;
use crate::render::track::{CompoundEdit, Stake, TrackEdit};
use crate::telemetry::log::{LogManager, MessageLevel};

struct ReplaceState {
    span: Span,
    blend: BlendContext,
    stakes: Vec<Option<Stake>>,
    old: Vec<[f32; 2]>,
    mixed: Vec<[f32; 2]>,
    faded: Vec<[f32; 2]>,
}

/// Consumer that splices incoming trajectory blocks into the transmitters'
/// own tracks, crossfading with the old data at both ends of the span.
///
/// Nothing reaches the tracks before `finish`, which commits the edits of
/// all transmitters together, or none of them; `cancel` drops the pending
/// stakes.
pub struct TrajectoryReplace {
    blend_len: i64,
    curve: BlendCurve,
    state: Option<ReplaceState>,
    logger: LogManager,
}

impl TrajectoryReplace {
    pub fn new(blend_len: i64, curve: BlendCurve) -> Self {
        Self {
            blend_len,
            curve,
            state: None,
            logger: LogManager::for_target("replace"),
        }
    }
}

impl RenderPlugin for TrajectoryReplace {
    fn begin(
        &mut self,
        context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let span = context.time_span();
        let mut stakes = Vec::with_capacity(source.num_transmitters());
        for (trns, transmitter) in context.transmitters().iter().enumerate() {
            let stake = if source.wants_trajectory(trns) {
                Some(transmitter.track.alloc(span)?)
            } else {
                None
            };
            stakes.push(stake);
        }

        self.state = Some(ReplaceState {
            span,
            blend: BlendContext::for_span(self.blend_len, span.len(), self.curve),
            stakes,
            old: Vec::new(),
            mixed: Vec::new(),
            faded: Vec::new(),
        });
        Ok(true)
    }

    fn render(
        &mut self,
        context: &mut RenderContext,
        source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let Some(state) = self.state.as_mut() else {
            return Ok(false);
        };
        let len = source.block_len;
        let block_span = source.block_span;
        let rel = block_span.start() - state.span.start();
        let fade_out_start = state.span.len() - state.blend.post_len();
        let in_fade_in = rel < state.blend.pre_len();
        let in_fade_out = rel + len as i64 > fade_out_start;

        state.old.resize(len, [0.0; 2]);
        state.mixed.resize(len, [0.0; 2]);
        state.faded.resize(len, [0.0; 2]);

        for (trns, slot) in state.stakes.iter_mut().enumerate() {
            let (Some(stake), Some(new)) = (slot.as_mut(), source.trajectory(trns)) else {
                continue;
            };
            state.mixed.copy_from_slice(new);

            if in_fade_in || in_fade_out {
                context.transmitters()[trns]
                    .track
                    .read(block_span, &mut state.old, 0)?;
            }
            if in_fade_in {
                state.blend.blend(rel, &state.old, new, &mut state.mixed, len);
            }
            if in_fade_out {
                state.faded.copy_from_slice(&state.mixed);
                state.blend.blend_out(
                    rel - fade_out_start,
                    &state.faded,
                    &state.old,
                    &mut state.mixed,
                    len,
                );
            }
            stake.write_frames(&state.mixed, 0, block_span)?;
        }
        Ok(true)
    }

    fn finish(
        &mut self,
        context: &mut RenderContext,
        _source: &mut RenderSource,
    ) -> RenderResult<bool> {
        let Some(state) = self.state.take() else {
            return Ok(false);
        };
        let mut edit = CompoundEdit::begin(format!("replace {:?}", state.span));
        for (trns, slot) in state.stakes.into_iter().enumerate() {
            let Some(stake) = slot else {
                continue;
            };
            let transmitter = &context.transmitters()[trns];
            let mut part = TrackEdit::begin(format!("replace {}", transmitter.name));
            part.clear(state.span);
            part.add(stake);
            edit.push(transmitter.track.as_ref(), part);
        }
        edit.perform()?;
        self.logger
            .record(&format!("replaced span {:?}", state.span));
        Ok(true)
    }

    fn cancel(&mut self, _context: &mut RenderContext, _source: &mut RenderSource) {
        if self.state.take().is_some() {
            self.logger
                .record_at(MessageLevel::Info, "discarded pending trajectory edit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::Transmitter;
    use crate::prelude::RenderError;
    use crate::render::track::{EditOp, MemoryTrack, TrackReader, TrackStore};
    use std::sync::Arc;

    /// Store whose reads work but whose edits are always refused.
    struct FullDisk(MemoryTrack);

    impl TrackReader for FullDisk {
        fn read(&self, span: Span, out: &mut [[f32; 2]], out_offset: usize) -> RenderResult<()> {
            self.0.read(span, out, out_offset)
        }
    }

    impl TrackStore for FullDisk {
        fn span(&self) -> Span {
            self.0.span()
        }

        fn apply(&self, _ops: &[EditOp]) -> RenderResult<()> {
            Err(RenderError::io("disk full"))
        }
    }

    fn run_blocks(track: Arc<MemoryTrack>, new: &[[f32; 2]], block: usize, finish: bool) {
        let span = Span::with_len(0, new.len() as i64);
        let mut ctx = RenderContext::new(
            span,
            100.0,
            vec![Transmitter::new("t0", track)],
            Vec::new(),
        )
        .unwrap();
        let mut source = RenderSource::new(1, 0);
        source.request_trajectory(0).unwrap();
        source.freeze_requests();
        source.allocate(block);

        let mut replace = TrajectoryReplace::new(10, BlendCurve::Linear);
        assert!(replace.begin(&mut ctx, &mut source).unwrap());
        for (i, chunk) in new.chunks(block).enumerate() {
            source.trajectory_mut(0).unwrap()[..chunk.len()].copy_from_slice(chunk);
            source.block_span = Span::with_len((i * block) as i64, chunk.len() as i64);
            source.block_offset = i * block;
            source.block_len = chunk.len();
            assert!(replace.render(&mut ctx, &mut source).unwrap());
        }
        if finish {
            assert!(replace.finish(&mut ctx, &mut source).unwrap());
        } else {
            replace.cancel(&mut ctx, &mut source);
            replace.cancel(&mut ctx, &mut source);
        }
    }

    #[test]
    fn replaced_span_fades_in_and_out() {
        let track = Arc::new(MemoryTrack::new(vec![[0.0, 0.0]; 100]));
        run_blocks(track.clone(), &vec![[1.0, 1.0]; 100], 7, true);

        let frames = track.snapshot().unwrap();
        assert_eq!(frames[0], [0.0, 0.0]);
        assert!((frames[5][0] - 0.5).abs() < 1e-6);
        assert_eq!(frames[50], [1.0, 1.0]);
        assert!((frames[95][0] - 0.5).abs() < 1e-6);
        assert!(frames[99][0] < 0.2);
    }

    #[test]
    fn cancelled_replace_leaves_track_untouched() {
        let original: Vec<[f32; 2]> = (0..60).map(|i| [i as f32, 0.0]).collect();
        let track = Arc::new(MemoryTrack::new(original.clone()));
        run_blocks(track.clone(), &vec![[5.0, 5.0]; 60], 16, false);
        assert_eq!(track.snapshot().unwrap(), original);
    }

    #[test]
    fn failed_commit_on_one_track_keeps_every_track() {
        let good = Arc::new(MemoryTrack::new(vec![[0.0, 0.0]; 40]));
        let full = Arc::new(FullDisk(MemoryTrack::new(vec![[0.0, 0.0]; 40])));
        let span = Span::with_len(0, 40);
        let mut ctx = RenderContext::new(
            span,
            100.0,
            vec![Transmitter::new("good", good.clone()), Transmitter::new("full", full)],
            Vec::new(),
        )
        .unwrap();
        let mut source = RenderSource::new(2, 0);
        source.request_all_trajectories().unwrap();
        source.freeze_requests();
        source.allocate(40);

        let mut replace = TrajectoryReplace::new(4, BlendCurve::Linear);
        assert!(replace.begin(&mut ctx, &mut source).unwrap());
        for trns in 0..2 {
            source.trajectory_mut(trns).unwrap().fill([1.0, 1.0]);
        }
        source.block_span = span;
        source.block_len = 40;
        assert!(replace.render(&mut ctx, &mut source).unwrap());

        let err = replace.finish(&mut ctx, &mut source).unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
        replace.cancel(&mut ctx, &mut source);
        assert_eq!(good.snapshot().unwrap(), vec![[0.0, 0.0]; 40]);
    }
}
