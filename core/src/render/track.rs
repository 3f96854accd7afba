use crate::math::span::Span;
use crate::prelude::{RenderError, RenderResult};
use log::{debug, warn};
use std::sync::RwLock;

/// Read access to a trajectory track.
pub trait TrackReader: Send + Sync {
    /// Fills `out[out_offset..out_offset + span.len()]` with the frames of
    /// `span`. Frames past the end of the data repeat the last valid
    /// frame, frames before the start repeat the first one, and an empty
    /// track reads as zeros.
    fn read(&self, span: Span, out: &mut [[f32; 2]], out_offset: usize) -> RenderResult<()>;
}

/// Write access to a trajectory track through transactional edits.
pub trait TrackStore: TrackReader {
    /// Extent of the stored data.
    fn span(&self) -> Span;

    /// Allocates a scratch stake covering `span`.
    fn alloc(&self, span: Span) -> RenderResult<Stake> {
        Stake::new(span)
    }

    /// Applies all operations atomically, or none of them.
    fn apply(&self, ops: &[EditOp]) -> RenderResult<()>;

    /// Operations that put back the current contents of everything `ops`
    /// would touch.
    fn revert_ops(&self, ops: &[EditOp]) -> RenderResult<Vec<EditOp>> {
        let extent = self.span();
        let mut touched: Option<Span> = None;
        for op in ops {
            let span = match op {
                EditOp::Clear(span) => *span,
                EditOp::Add(stake) => stake.span(),
                EditOp::Truncate(len) => Span::new((*len).min(extent.stop()), extent.stop())?,
            };
            touched = Some(touched.map_or(span, |seen| seen.union(&span)));
        }
        let Some(touched) = touched else {
            return Ok(Vec::new());
        };

        let mut revert = Vec::with_capacity(2);
        if touched.stop() > extent.stop() {
            revert.push(EditOp::Truncate(extent.stop()));
        }
        if let Some(hit) = touched.intersection(&extent).filter(|hit| !hit.is_empty()) {
            let mut stake = Stake::new(hit)?;
            self.read(hit, &mut stake.frames, 0)?;
            revert.push(EditOp::Add(stake));
        }
        Ok(revert)
    }
}

/// Block of trajectory frames destined for a span of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Stake {
    span: Span,
    frames: Vec<[f32; 2]>,
}

impl Stake {
    pub fn new(span: Span) -> RenderResult<Self> {
        let len = usize::try_from(span.len())
            .map_err(|_| RenderError::invalid("stake span too large"))?;
        Ok(Self {
            span,
            frames: vec![[0.0; 2]; len],
        })
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn frames(&self) -> &[[f32; 2]] {
        &self.frames
    }

    /// Copies `buf[offset..offset + span.len()]` to the frames of `span`,
    /// which must lie inside the stake.
    pub fn write_frames(
        &mut self,
        buf: &[[f32; 2]],
        offset: usize,
        span: Span,
    ) -> RenderResult<()> {
        if span.is_empty() {
            return Ok(());
        }
        if span.intersection(&self.span) != Some(span) {
            return Err(RenderError::io(format!(
                "span {:?} lies outside stake {:?}",
                span, self.span
            )));
        }
        let len = span.len() as usize;
        let src = buf
            .get(offset..offset + len)
            .ok_or_else(|| RenderError::io("source buffer shorter than span"))?;
        let start = (span.start() - self.span.start()) as usize;
        self.frames[start..start + len].copy_from_slice(src);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Resets the frames of a span to the origin.
    Clear(Span),
    /// Writes a stake's frames into the track.
    Add(Stake),
    /// Drops every frame from this index on.
    Truncate(i64),
}

/// Pending, all-or-nothing modification of a track.
#[derive(Debug, Default)]
pub struct TrackEdit {
    name: String,
    ops: Vec<EditOp>,
}

impl TrackEdit {
    pub fn begin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    pub fn clear(&mut self, span: Span) {
        self.ops.push(EditOp::Clear(span));
    }

    pub fn add(&mut self, stake: Stake) {
        self.ops.push(EditOp::Add(stake));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Commits every queued operation to `store`.
    pub fn perform(self, store: &dyn TrackStore) -> RenderResult<()> {
        debug!("performing edit '{}' ({} ops)", self.name, self.ops.len());
        store.apply(&self.ops)
    }

    /// Drops every queued operation.
    pub fn cancel(self) {
        debug!("cancelled edit '{}' ({} ops)", self.name, self.ops.len());
    }
}

/// Edits of several tracks committed as one: when a track rejects its
/// part, the tracks already written are restored before the error is
/// returned.
pub struct CompoundEdit<'a> {
    name: String,
    parts: Vec<(&'a dyn TrackStore, TrackEdit)>,
}

impl<'a> CompoundEdit<'a> {
    pub fn begin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: Vec::new(),
        }
    }

    pub fn push(&mut self, store: &'a dyn TrackStore, edit: TrackEdit) {
        self.parts.push((store, edit));
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn perform(self) -> RenderResult<()> {
        debug!("performing edit '{}' on {} tracks", self.name, self.parts.len());
        let mut applied: Vec<(&dyn TrackStore, Vec<EditOp>)> = Vec::with_capacity(self.parts.len());
        for (store, edit) in self.parts {
            let result = store.revert_ops(&edit.ops).and_then(|revert| {
                store.apply(&edit.ops)?;
                Ok(revert)
            });
            match result {
                Ok(revert) => applied.push((store, revert)),
                Err(err) => {
                    for (done, revert) in applied.into_iter().rev() {
                        if let Err(undo_err) = done.apply(&revert) {
                            warn!(
                                "could not restore a track of edit '{}': {}",
                                self.name, undo_err
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub fn cancel(self) {
        for (_, edit) in self.parts {
            edit.cancel();
        }
    }
}

/// Trajectory track held in memory, starting at frame 0.
#[derive(Debug, Default)]
pub struct MemoryTrack {
    frames: RwLock<Vec<[f32; 2]>>,
}

impl MemoryTrack {
    pub fn new(frames: Vec<[f32; 2]>) -> Self {
        Self {
            frames: RwLock::new(frames),
        }
    }

    /// Copy of all frames.
    pub fn snapshot(&self) -> RenderResult<Vec<[f32; 2]>> {
        let guard = self
            .frames
            .read()
            .map_err(|_| RenderError::io("track lock poisoned"))?;
        Ok(guard.clone())
    }

    pub fn len(&self) -> usize {
        self.frames.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TrackReader for MemoryTrack {
    fn read(&self, span: Span, out: &mut [[f32; 2]], out_offset: usize) -> RenderResult<()> {
        let len = span.len() as usize;
        let dst = out
            .get_mut(out_offset..out_offset + len)
            .ok_or_else(|| RenderError::io("read buffer shorter than span"))?;
        let guard = self
            .frames
            .read()
            .map_err(|_| RenderError::io("track lock poisoned"))?;

        if guard.is_empty() {
            dst.fill([0.0; 2]);
            return Ok(());
        }
        let last = guard.len() as i64 - 1;
        for (i, frame) in dst.iter_mut().enumerate() {
            let idx = (span.start() + i as i64).clamp(0, last);
            *frame = guard[idx as usize];
        }
        Ok(())
    }
}

impl TrackStore for MemoryTrack {
    fn span(&self) -> Span {
        Span::with_len(0, self.len() as i64)
    }

    fn apply(&self, ops: &[EditOp]) -> RenderResult<()> {
        for op in ops {
            match op {
                EditOp::Add(stake) if stake.span().start() < 0 => {
                    return Err(RenderError::io(format!(
                        "stake {:?} starts before the track",
                        stake.span()
                    )));
                }
                EditOp::Truncate(len) if *len < 0 => {
                    return Err(RenderError::io(format!("cannot truncate to {}", len)));
                }
                _ => {}
            }
        }

        let mut frames = self
            .frames
            .write()
            .map_err(|_| RenderError::io("track lock poisoned"))?;
        for op in ops {
            match op {
                EditOp::Clear(span) => {
                    let valid = Span::with_len(0, frames.len() as i64);
                    if let Some(hit) = span.intersection(&valid) {
                        frames[hit.start() as usize..hit.stop() as usize].fill([0.0; 2]);
                    }
                }
                EditOp::Add(stake) => {
                    let span = stake.span();
                    let stop = span.stop() as usize;
                    if stop > frames.len() {
                        let pad = frames.last().copied().unwrap_or([0.0; 2]);
                        frames.resize(stop, pad);
                    }
                    frames[span.start() as usize..stop].copy_from_slice(stake.frames());
                }
                EditOp::Truncate(len) => frames.truncate(*len as usize),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<[f32; 2]> {
        (0..len).map(|i| [i as f32, -(i as f32)]).collect()
    }

    #[test]
    fn read_pads_with_edge_frames() {
        let track = MemoryTrack::new(ramp(4));
        let mut out = vec![[9.0; 2]; 8];
        track.read(Span::new(-1, 6).unwrap(), &mut out, 1).unwrap();
        assert_eq!(out[0], [9.0, 9.0]);
        assert_eq!(out[1], [0.0, 0.0]);
        assert_eq!(out[2], [0.0, 0.0]);
        assert_eq!(out[5], [3.0, -3.0]);
        assert_eq!(out[7], [3.0, -3.0]);
    }

    #[test]
    fn empty_track_reads_zeros() {
        let track = MemoryTrack::default();
        let mut out = vec![[1.0; 2]; 3];
        track.read(Span::with_len(0, 3), &mut out, 0).unwrap();
        assert!(out.iter().all(|f| *f == [0.0, 0.0]));
    }

    #[test]
    fn stake_rejects_foreign_spans() {
        let mut stake = Stake::new(Span::new(10, 20).unwrap()).unwrap();
        let buf = ramp(10);
        assert!(stake.write_frames(&buf, 0, Span::new(15, 25).unwrap()).is_err());
        stake.write_frames(&buf, 2, Span::new(12, 14).unwrap()).unwrap();
        assert_eq!(stake.frames()[2], [2.0, -2.0]);
        assert_eq!(stake.frames()[3], [3.0, -3.0]);
    }

    #[test]
    fn performed_edit_replaces_span() {
        let track = MemoryTrack::new(ramp(10));
        let span = Span::new(2, 5).unwrap();
        let mut stake = track.alloc(span).unwrap();
        stake.write_frames(&[[7.0, 7.0]; 3], 0, span).unwrap();

        let mut edit = TrackEdit::begin("replace");
        edit.clear(span);
        edit.add(stake);
        edit.perform(&track).unwrap();

        let frames = track.snapshot().unwrap();
        assert_eq!(frames[1], [1.0, -1.0]);
        assert_eq!(&frames[2..5], &[[7.0, 7.0]; 3]);
        assert_eq!(frames[5], [5.0, -5.0]);
    }

    #[test]
    fn failing_edit_changes_nothing() {
        let track = MemoryTrack::new(ramp(6));
        let mut edit = TrackEdit::begin("broken");
        edit.clear(Span::new(0, 6).unwrap());
        edit.add(Stake::new(Span::new(-2, 1).unwrap()).unwrap());
        assert!(edit.perform(&track).is_err());
        assert_eq!(track.snapshot().unwrap(), ramp(6));
    }

    #[test]
    fn stake_past_the_end_extends_the_track() {
        let track = MemoryTrack::new(ramp(3));
        let span = Span::new(5, 6).unwrap();
        let mut stake = track.alloc(span).unwrap();
        stake.write_frames(&[[1.0, 1.0]], 0, span).unwrap();
        let mut edit = TrackEdit::begin("append");
        edit.add(stake);
        edit.perform(&track).unwrap();
        let frames = track.snapshot().unwrap();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[4], [2.0, -2.0]);
    }

    /// Accepts reads, refuses every edit.
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

    fn overwrite(track: &dyn TrackStore, span: Span, value: f32) -> TrackEdit {
        let mut stake = track.alloc(span).unwrap();
        let frames = vec![[value; 2]; span.len() as usize];
        stake.write_frames(&frames, 0, span).unwrap();
        let mut edit = TrackEdit::begin("overwrite");
        edit.clear(span);
        edit.add(stake);
        edit
    }

    #[test]
    fn compound_edit_restores_written_tracks_on_failure() {
        let a = MemoryTrack::new(ramp(8));
        let b = MemoryTrack::new(ramp(4));
        let full = FullDisk(MemoryTrack::new(ramp(8)));

        let mut edit = CompoundEdit::begin("all");
        edit.push(&a, overwrite(&a, Span::new(2, 6).unwrap(), 9.0));
        edit.push(&b, overwrite(&b, Span::new(2, 7).unwrap(), 9.0));
        edit.push(&full, overwrite(&full, Span::new(0, 8).unwrap(), 9.0));
        assert_eq!(edit.len(), 3);

        let err = edit.perform().unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
        assert_eq!(a.snapshot().unwrap(), ramp(8));
        assert_eq!(b.snapshot().unwrap(), ramp(4));
    }

    #[test]
    fn compound_edit_commits_every_track() {
        let a = MemoryTrack::new(ramp(5));
        let b = MemoryTrack::new(ramp(5));
        let mut edit = CompoundEdit::begin("all");
        edit.push(&a, overwrite(&a, Span::new(0, 2).unwrap(), 1.0));
        edit.push(&b, overwrite(&b, Span::new(3, 5).unwrap(), 2.0));
        edit.perform().unwrap();
        assert_eq!(a.snapshot().unwrap()[1], [1.0, 1.0]);
        assert_eq!(b.snapshot().unwrap()[4], [2.0, 2.0]);
        assert_eq!(a.snapshot().unwrap()[2], [2.0, -2.0]);
    }

    #[test]
    fn revert_ops_undo_growth_and_overwrites() {
        let track = MemoryTrack::new(ramp(3));
        let ops = vec![EditOp::Clear(Span::new(1, 6).unwrap())];
        let revert = track.revert_ops(&ops).unwrap();
        assert_eq!(revert[0], EditOp::Truncate(3));
        assert!(track.revert_ops(&[]).unwrap().is_empty());

        let edit = overwrite(&track, Span::new(1, 6).unwrap(), 4.0);
        edit.perform(&track).unwrap();
        assert_eq!(track.len(), 6);
        track.apply(&revert).unwrap();
        assert_eq!(track.snapshot().unwrap(), ramp(3));
    }
}
