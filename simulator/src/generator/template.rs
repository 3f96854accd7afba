use std::f32::consts::TAU;

/// Straight segment from `from` to `to`, endpoints included.
pub fn line(length: usize, from: [f32; 2], to: [f32; 2]) -> Vec<[f32; 2]> {
    let last = length.saturating_sub(1).max(1) as f32;
    (0..length)
        .map(|i| {
            let t = i as f32 / last;
            [from[0] + (to[0] - from[0]) * t, from[1] + (to[1] - from[1]) * t]
        })
        .collect()
}

/// Counter-clockwise orbit starting on the positive x axis.
pub fn circle(length: usize, center: [f32; 2], radius: f32, turns: f32) -> Vec<[f32; 2]> {
    (0..length)
        .map(|i| {
            let phase = (i as f32 / length.max(1) as f32) * TAU * turns;
            [center[0] + radius * phase.cos(), center[1] + radius * phase.sin()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_hits_both_endpoints() {
        let path = line(11, [0.0, 0.0], [1.0, 2.0]);
        assert_eq!(path[0], [0.0, 0.0]);
        assert_eq!(path[10], [1.0, 2.0]);
        assert!((path[5][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn circle_keeps_its_radius() {
        let path = circle(64, [1.0, 1.0], 2.0, 1.5);
        for p in path {
            let r = ((p[0] - 1.0).powi(2) + (p[1] - 1.0).powi(2)).sqrt();
            assert!((r - 2.0).abs() < 1e-5);
        }
    }
}
