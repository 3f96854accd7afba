use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// A receiver maps trajectory points to a scalar sensitivity.
pub trait Receiver: Send + Sync {
    fn name(&self) -> &str;

    /// Writes `len` sensitivities to `out`, evaluating
    /// `points[offset + i * stride]` for each `i`.
    fn sensitivities(
        &self,
        points: &[[f32; 2]],
        out: &mut [f32],
        offset: usize,
        len: usize,
        stride: usize,
    );
}

/// Raised-cosine falloff: 1 at the centre, 0 at and beyond `radius`.
fn radial_falloff(dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 || dist >= radius {
        return 0.0;
    }
    0.5 * (1.0 + (PI * dist / radius).cos())
}

/// Omnidirectional receiver with a circular catchment area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleReceiver {
    pub name: String,
    pub center: [f32; 2],
    pub radius: f32,
}

impl CircleReceiver {
    pub fn new(name: impl Into<String>, center: [f32; 2], radius: f32) -> Self {
        Self {
            name: name.into(),
            center,
            radius,
        }
    }

    fn sense(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        radial_falloff((dx * dx + dy * dy).sqrt(), self.radius)
    }
}

impl Receiver for CircleReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn sensitivities(
        &self,
        points: &[[f32; 2]],
        out: &mut [f32],
        offset: usize,
        len: usize,
        stride: usize,
    ) {
        let stride = stride.max(1);
        for (i, value) in out.iter_mut().take(len).enumerate() {
            *value = points
                .get(offset + i * stride)
                .map_or(0.0, |&point| self.sense(point));
        }
    }
}

/// Directional receiver covering an angular sector around its centre.
///
/// Angles are in radians, counter-clockwise from the positive x axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorReceiver {
    pub name: String,
    pub center: [f32; 2],
    pub radius: f32,
    pub start_angle: f32,
    pub extent: f32,
}

impl SectorReceiver {
    fn sense(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > 0.0 {
            let angle = (dy.atan2(dx) - self.start_angle).rem_euclid(TAU);
            if angle > self.extent {
                return 0.0;
            }
        }
        radial_falloff(dist, self.radius)
    }
}

impl Receiver for SectorReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn sensitivities(
        &self,
        points: &[[f32; 2]],
        out: &mut [f32],
        offset: usize,
        len: usize,
        stride: usize,
    ) {
        let stride = stride.max(1);
        for (i, value) in out.iter_mut().take(len).enumerate() {
            *value = points
                .get(offset + i * stride)
                .map_or(0.0, |&point| self.sense(point));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_sensitivity_falls_off_with_distance() {
        let rcv = CircleReceiver::new("c", [0.0, 0.0], 2.0);
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [5.0, 5.0]];
        let mut out = [0.0; 4];
        rcv.sensitivities(&points, &mut out, 0, 4, 1);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn stride_and_offset_select_points() {
        let rcv = CircleReceiver::new("c", [0.0, 0.0], 1.0);
        let points = [[9.0, 9.0], [0.0, 0.0], [9.0, 9.0], [0.0, 0.0]];
        let mut out = [0.5; 2];
        rcv.sensitivities(&points, &mut out, 1, 2, 2);
        assert_eq!(out, [1.0, 1.0]);
    }

    #[test]
    fn sector_ignores_points_outside_its_angle() {
        let rcv = SectorReceiver {
            name: "s".into(),
            center: [0.0, 0.0],
            radius: 4.0,
            start_angle: 0.0,
            extent: PI / 2.0,
        };
        let points = [[1.0, 1.0], [-1.0, -1.0]];
        let mut out = [0.0; 2];
        rcv.sensitivities(&points, &mut out, 0, 2, 1);
        assert!(out[0] > 0.0);
        assert_eq!(out[1], 0.0);
    }
}
