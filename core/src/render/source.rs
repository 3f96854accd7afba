use crate::math::span::Span;
use crate::prelude::{RenderError, RenderResult};

/// Per-block request flags and result buffers exchanged with a plug-in.
///
/// Plug-ins set the request flags during `begin`; afterwards the flags are
/// frozen and the driver fills the matching buffers once per block. Only
/// the first `block_len` entries of a buffer are valid for the current
/// block.
#[derive(Debug, Clone)]
pub struct RenderSource {
    num_transmitters: usize,
    num_receivers: usize,
    traj_request: Vec<bool>,
    sense_request: Vec<Vec<bool>>,
    traj_buf: Vec<Option<Vec<[f32; 2]>>>,
    sense_buf: Vec<Vec<Option<Vec<f32>>>>,
    frozen: bool,
    pub block_span: Span,
    pub block_offset: usize,
    pub block_len: usize,
}

impl RenderSource {
    pub fn new(num_transmitters: usize, num_receivers: usize) -> Self {
        Self {
            num_transmitters,
            num_receivers,
            traj_request: vec![false; num_transmitters],
            sense_request: vec![vec![false; num_receivers]; num_transmitters],
            traj_buf: vec![None; num_transmitters],
            sense_buf: vec![vec![None; num_receivers]; num_transmitters],
            frozen: false,
            block_span: Span::default(),
            block_offset: 0,
            block_len: 0,
        }
    }

    pub fn num_transmitters(&self) -> usize {
        self.num_transmitters
    }

    pub fn num_receivers(&self) -> usize {
        self.num_receivers
    }

    pub fn request_trajectory(&mut self, trns: usize) -> RenderResult<()> {
        self.check_mutable()?;
        let flag = self
            .traj_request
            .get_mut(trns)
            .ok_or_else(|| RenderError::invalid(format!("no transmitter {}", trns)))?;
        *flag = true;
        Ok(())
    }

    pub fn request_sense(&mut self, trns: usize, rcv: usize) -> RenderResult<()> {
        self.check_mutable()?;
        let flag = self
            .sense_request
            .get_mut(trns)
            .and_then(|row| row.get_mut(rcv))
            .ok_or_else(|| {
                RenderError::invalid(format!("no transmitter/receiver pair {}/{}", trns, rcv))
            })?;
        *flag = true;
        Ok(())
    }

    /// Requests every transmitter's trajectory.
    pub fn request_all_trajectories(&mut self) -> RenderResult<()> {
        for trns in 0..self.num_transmitters {
            self.request_trajectory(trns)?;
        }
        Ok(())
    }

    pub fn wants_trajectory(&self, trns: usize) -> bool {
        self.traj_request.get(trns).copied().unwrap_or(false)
    }

    pub fn wants_sense(&self, trns: usize, rcv: usize) -> bool {
        self.sense_request
            .get(trns)
            .and_then(|row| row.get(rcv))
            .copied()
            .unwrap_or(false)
    }

    /// True when the transmitter's trajectory has to be read at all.
    pub fn has_request(&self, trns: usize) -> bool {
        self.wants_trajectory(trns)
            || self
                .sense_request
                .get(trns)
                .is_some_and(|row| row.iter().any(|&flag| flag))
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Fixes the request flags; called once `begin` has returned.
    pub fn freeze_requests(&mut self) {
        self.frozen = true;
    }

    /// (Re)allocates the buffers of every requested stream to `len` frames.
    pub fn allocate(&mut self, len: usize) {
        for trns in 0..self.num_transmitters {
            self.traj_buf[trns] = self.traj_request[trns].then(|| vec![[0.0; 2]; len]);
            for rcv in 0..self.num_receivers {
                self.sense_buf[trns][rcv] = self.sense_request[trns][rcv].then(|| vec![0.0; len]);
            }
        }
    }

    /// Valid trajectory frames of the current block.
    pub fn trajectory(&self, trns: usize) -> Option<&[[f32; 2]]> {
        let len = self.block_len;
        self.traj_buf
            .get(trns)
            .and_then(Option::as_deref)
            .map(|buf| &buf[..len.min(buf.len())])
    }

    pub fn trajectory_mut(&mut self, trns: usize) -> Option<&mut Vec<[f32; 2]>> {
        self.traj_buf.get_mut(trns).and_then(Option::as_mut)
    }

    /// Valid sensitivity samples of the current block.
    pub fn sense(&self, trns: usize, rcv: usize) -> Option<&[f32]> {
        let len = self.block_len;
        self.sense_buf
            .get(trns)
            .and_then(|row| row.get(rcv))
            .and_then(Option::as_deref)
            .map(|buf| &buf[..len.min(buf.len())])
    }

    pub fn sense_mut(&mut self, trns: usize, rcv: usize) -> Option<&mut Vec<f32>> {
        self.sense_buf
            .get_mut(trns)
            .and_then(|row| row.get_mut(rcv))
            .and_then(Option::as_mut)
    }

    fn check_mutable(&self) -> RenderResult<()> {
        if self.frozen {
            return Err(RenderError::invalid(
                "request flags are fixed once begin has returned",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_exist_only_for_requested_streams() {
        let mut source = RenderSource::new(2, 3);
        source.request_trajectory(0).unwrap();
        source.request_sense(1, 2).unwrap();
        source.allocate(16);
        source.block_len = 8;

        assert_eq!(source.trajectory(0).unwrap().len(), 8);
        assert!(source.trajectory(1).is_none());
        assert_eq!(source.sense(1, 2).unwrap().len(), 8);
        assert!(source.sense(0, 0).is_none());
        assert!(source.has_request(1));
        assert!(!source.wants_trajectory(1));
    }

    #[test]
    fn frozen_requests_cannot_change() {
        let mut source = RenderSource::new(1, 1);
        source.freeze_requests();
        assert!(source.request_trajectory(0).is_err());
        assert!(source.request_sense(0, 0).is_err());
    }

    #[test]
    fn out_of_range_requests_fail() {
        let mut source = RenderSource::new(1, 1);
        assert!(source.request_trajectory(3).is_err());
        assert!(source.request_sense(0, 4).is_err());
    }
}
