use crate::generator::template::{circle, line};
use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of a synthetic transmitter trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrajectoryShape {
    Line {
        from: [f32; 2],
        to: [f32; 2],
    },
    Circle {
        center: [f32; 2],
        radius: f32,
        #[serde(default = "default_turns")]
        turns: f32,
    },
    /// Seeded random walk confined to a square of half-width `bound`.
    RandomWalk {
        start: [f32; 2],
        step: f32,
        bound: f32,
        seed: u64,
    },
}

fn default_turns() -> f32 {
    1.0
}

impl Default for TrajectoryShape {
    fn default() -> Self {
        TrajectoryShape::Circle {
            center: [0.0, 0.0],
            radius: 1.0,
            turns: default_turns(),
        }
    }
}

fn random_walk(length: usize, start: [f32; 2], step: f32, bound: f32, seed: u64) -> Vec<[f32; 2]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let limit = bound.abs();
    let mut point = start;
    let mut frames = Vec::with_capacity(length);
    for _ in 0..length {
        frames.push(point);
        let dx = rng.gen_range(-1.0f32..=1.0) * step;
        let dy = rng.gen_range(-1.0f32..=1.0) * step;
        point = [
            (point[0] + dx).clamp(-limit, limit),
            (point[1] + dy).clamp(-limit, limit),
        ];
    }
    frames
}

pub fn build_trajectory(shape: &TrajectoryShape, frames: usize) -> anyhow::Result<Vec<[f32; 2]>> {
    let path = match shape {
        TrajectoryShape::Line { from, to } => line(frames, *from, *to),
        TrajectoryShape::Circle {
            center,
            radius,
            turns,
        } => circle(frames, *center, *radius, *turns),
        TrajectoryShape::RandomWalk {
            start,
            step,
            bound,
            seed,
        } => random_walk(frames, *start, *step, *bound, *seed),
    };
    path.iter()
        .all(|p| p[0].is_finite() && p[1].is_finite())
        .then_some(path)
        .with_context(|| format!("trajectory {:?} produced non-finite points", shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_frame_count() {
        let path = build_trajectory(&TrajectoryShape::default(), 2048).unwrap();
        assert_eq!(path.len(), 2048);
        assert!((path[0][0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn random_walk_is_reproducible_and_bounded() {
        let shape = TrajectoryShape::RandomWalk {
            start: [0.0, 0.0],
            step: 0.2,
            bound: 1.0,
            seed: 13,
        };
        let a = build_trajectory(&shape, 500).unwrap();
        let b = build_trajectory(&shape, 500).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p[0].abs() <= 1.0 && p[1].abs() <= 1.0));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let shape = TrajectoryShape::Line {
            from: [0.0, 0.0],
            to: [f32::NAN, 1.0],
        };
        assert!(build_trajectory(&shape, 10).is_err());
    }
}
