use crate::generator::profile::build_trajectory;
use crate::workflow::config::{JobConfig, WorkflowConfig};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use trajcore::math::StatsHelper;
use trajcore::plugins::{consumer_for, SenseBounce, SenseSummary, TrajectoryFilter};
use trajcore::render::{
    CancelToken, CircleReceiver, LogHost, MemoryTrack, ProducerKind, Receiver, RenderContext,
    RenderDriver, Transmitter,
};
use trajcore::telemetry::{Metrics, MetricsRecorder};
use trajcore::{RenderOutcome, Span};

/// How far a transmitter's stored trajectory moved during the job.
#[derive(Debug, Clone, Serialize)]
pub struct TrackChange {
    pub transmitter: String,
    pub max_deviation: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub outcome: RenderOutcome,
    pub metrics: Metrics,
    pub sense: Vec<SenseSummary>,
    pub tracks: Vec<TrackChange>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn execute(&self, token: &CancelToken) -> anyhow::Result<WorkflowResult> {
        let config = &self.config;
        let mut tracks = Vec::with_capacity(config.transmitters.len());
        let mut originals = Vec::with_capacity(config.transmitters.len());
        for trns in &config.transmitters {
            let frames = build_trajectory(&trns.shape, config.frames)
                .with_context(|| format!("generating trajectory for {}", trns.name))?;
            originals.push(frames.clone());
            tracks.push(Arc::new(MemoryTrack::new(frames)));
        }

        let transmitters = config
            .transmitters
            .iter()
            .zip(&tracks)
            .map(|(trns, track)| Transmitter::new(trns.name.clone(), track.clone()))
            .collect();
        let receivers: Vec<Arc<dyn Receiver>> = config
            .receivers
            .iter()
            .map(|rcv| {
                Arc::new(CircleReceiver::new(rcv.name.clone(), rcv.center, rcv.radius))
                    as Arc<dyn Receiver>
            })
            .collect();

        let mut context = RenderContext::new(
            Span::with_len(0, config.frames as i64),
            config.source_rate,
            transmitters,
            receivers,
        )
        .context("creating render context")?;
        context.set_block_sizes(config.block_sizes);

        let mut driver = RenderDriver::new(Arc::new(LogHost::new(token.clone())))
            .with_resampler(config.quality.build())
            .with_metrics(self.metrics.clone());

        let mut sense = Vec::new();
        let outcome = match &config.job {
            JobConfig::Filter {
                transform,
                consumer,
                blend_len,
                curve,
            } => {
                context.set_plugin(Some(ProducerKind::TrajectoryFilter));
                context.set_consumer(*consumer);
                let mut filter = TrajectoryFilter::new(*transform);
                if let Some(kind) = context.consumer() {
                    filter = filter.with_consumer(consumer_for(kind, *blend_len, *curve));
                }
                driver
                    .run(&mut context, &mut filter)
                    .context("running trajectory filter")?
            }
            JobConfig::Bounce { target_rate } => {
                context.set_plugin(Some(ProducerKind::SenseBounce));
                let mut bounce = SenseBounce::new()
                    .with_target_rate(*target_rate)
                    .with_pref_block_size(config.block_sizes.pref);
                let table = bounce.table();
                let outcome = driver
                    .run(&mut context, &mut bounce)
                    .context("running sensitivity bounce")?;
                let table = table
                    .lock()
                    .map_err(|_| anyhow::anyhow!("sense table lock poisoned"))?;
                sense = table.summary();
                outcome
            }
        };

        let mut changes = Vec::with_capacity(tracks.len());
        for ((trns, track), original) in config.transmitters.iter().zip(&tracks).zip(&originals) {
            let frames = track
                .snapshot()
                .with_context(|| format!("reading back {}", trns.name))?;
            changes.push(TrackChange {
                transmitter: trns.name.clone(),
                max_deviation: StatsHelper::max_deviation(original, &frames),
            });
        }

        Ok(WorkflowResult {
            outcome,
            metrics: self.metrics.snapshot(),
            sense,
            tracks: changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::TrajectoryShape;
    use crate::workflow::config::TransmitterConfig;
    use trajcore::plugins::PointTransform;
    use trajcore::render::{BlendCurve, ConsumerKind};

    #[test]
    fn runner_executes_bounce() {
        let cfg = WorkflowConfig::from_args(500, 100.0, Some(200.0));
        let runner = Runner::new(cfg);
        let result = runner.execute(&CancelToken::new()).unwrap();
        assert_eq!(result.outcome, RenderOutcome::Completed);
        assert_eq!(result.sense.len(), 2);
        assert!(result.sense.iter().all(|s| s.frames == 1000));
        assert!(result.sense.iter().all(|s| s.peak > 0.5));
        assert_eq!(result.tracks[0].max_deviation, 0.0);
        assert_eq!(result.metrics.completed, 1);
    }

    #[test]
    fn runner_filter_moves_the_track() {
        let mut cfg = WorkflowConfig::from_args(400, 50.0, None);
        cfg.transmitters = vec![TransmitterConfig {
            name: "a".into(),
            shape: TrajectoryShape::Line {
                from: [0.0, 0.0],
                to: [1.0, 0.0],
            },
        }];
        cfg.job = JobConfig::Filter {
            transform: PointTransform::Translate { dx: 0.0, dy: 2.0 },
            consumer: Some(ConsumerKind::TrajectoryReplace),
            blend_len: 20,
            curve: BlendCurve::EqualPower,
        };

        let result = Runner::new(cfg).execute(&CancelToken::new()).unwrap();
        assert_eq!(result.outcome, RenderOutcome::Completed);
        assert!((result.tracks[0].max_deviation - 2.0).abs() < 1e-5);
        assert!(result.sense.is_empty());
    }

    #[test]
    fn cancelled_token_stops_before_the_first_block() {
        let token = CancelToken::new();
        token.cancel();
        let result = Runner::new(WorkflowConfig::from_args(300, 100.0, None))
            .execute(&token)
            .unwrap();
        assert_eq!(result.outcome, RenderOutcome::Cancelled);
        assert_eq!(result.metrics.blocks, 0);
        assert!(result.sense.iter().all(|s| s.frames == 0));
    }
}
