use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Gain envelope mapping a normalised position `t` in `[0, 1]` to a gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendCurve {
    #[default]
    Linear,
    EqualPower,
    SCurve,
}

impl BlendCurve {
    pub fn gain(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            BlendCurve::Linear => t,
            BlendCurve::EqualPower => (t * FRAC_PI_2).sin(),
            BlendCurve::SCurve => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Crossfade lengths and curves applied at the edges of a rewritten span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendContext {
    pre_len: i64,
    post_len: i64,
    fade_in: BlendCurve,
    fade_out: BlendCurve,
}

impl BlendContext {
    pub fn new(pre_len: i64, post_len: i64, fade_in: BlendCurve, fade_out: BlendCurve) -> Self {
        Self {
            pre_len: pre_len.max(0),
            post_len: post_len.max(0),
            fade_in,
            fade_out,
        }
    }

    /// Symmetric crossfade of `blend_len` frames at both ends of a span of
    /// `span_len` frames. When both fades do not fit, each is cut to half
    /// the span.
    pub fn for_span(blend_len: i64, span_len: i64, curve: BlendCurve) -> Self {
        let limit = span_len.max(0) / 2;
        let len = blend_len.clamp(0, limit);
        Self::new(len, len, curve, curve)
    }

    /// No crossfade at all.
    pub fn none() -> Self {
        Self::new(0, 0, BlendCurve::Linear, BlendCurve::Linear)
    }

    pub fn pre_len(&self) -> i64 {
        self.pre_len
    }

    pub fn post_len(&self) -> i64 {
        self.post_len
    }

    /// Fade-in over `pre_len` frames: `dst = a * (1 - g) + b * g`.
    pub fn blend(
        &self,
        offset: i64,
        src_a: &[[f32; 2]],
        src_b: &[[f32; 2]],
        dst: &mut [[f32; 2]],
        len: usize,
    ) {
        mix(self.fade_in, self.pre_len, offset, src_a, src_b, dst, len);
    }

    /// Fade-out over `post_len` frames, with the same weighting as [`blend`](Self::blend).
    pub fn blend_out(
        &self,
        offset: i64,
        src_a: &[[f32; 2]],
        src_b: &[[f32; 2]],
        dst: &mut [[f32; 2]],
        len: usize,
    ) {
        mix(self.fade_out, self.post_len, offset, src_a, src_b, dst, len);
    }
}

fn mix(
    curve: BlendCurve,
    fade_len: i64,
    offset: i64,
    src_a: &[[f32; 2]],
    src_b: &[[f32; 2]],
    dst: &mut [[f32; 2]],
    len: usize,
) {
    for (i, ((out, a), b)) in dst.iter_mut().zip(src_a).zip(src_b).take(len).enumerate() {
        let pos = offset + i as i64;
        let t = if fade_len > 0 {
            pos as f32 / fade_len as f32
        } else if pos >= 0 {
            1.0
        } else {
            0.0
        };
        let g = curve.gain(t);
        out[0] = a[0] * (1.0 - g) + b[0] * g;
        out[1] = a[1] * (1.0 - g) + b[1] * g;
    }
}
