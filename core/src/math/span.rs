use crate::prelude::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Half-open frame interval `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    pub fn new(start: i64, stop: i64) -> RenderResult<Self> {
        if stop < start {
            return Err(RenderError::invalid(format!(
                "span stop {} precedes start {}",
                stop, start
            )));
        }
        Ok(Self { start, stop })
    }

    /// Span of `len` frames beginning at `start`.
    pub fn with_len(start: i64, len: i64) -> Self {
        Self {
            start,
            stop: start + len.max(0),
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn len(&self) -> i64 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    pub fn contains(&self, frame: i64) -> bool {
        frame >= self.start && frame < self.stop
    }

    /// Smallest span covering both operands.
    pub fn union(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// Overlapping part, or `None` when the spans share no frame.
    pub fn intersection(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        (start < stop).then_some(Span { start, stop })
    }

    pub fn shift(&self, delta: i64) -> Span {
        Span {
            start: self.start + delta,
            stop: self.stop + delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_rejects_reversed_bounds() {
        assert!(Span::new(10, 5).is_err());
        assert_eq!(Span::new(5, 5).unwrap().len(), 0);
    }

    #[test]
    fn union_and_intersection() {
        let a = Span::new(0, 10).unwrap();
        let b = Span::new(5, 20).unwrap();
        assert_eq!(a.union(&b), Span::new(0, 20).unwrap());
        assert_eq!(a.intersection(&b), Some(Span::new(5, 10).unwrap()));

        let c = Span::new(10, 12).unwrap();
        assert_eq!(a.intersection(&c), None);
        assert!(a.contains(9));
        assert!(!a.contains(10));
    }

    #[test]
    fn shift_keeps_length() {
        let span = Span::with_len(100, 24).shift(-50);
        assert_eq!(span.start(), 50);
        assert_eq!(span.len(), 24);
    }
}
