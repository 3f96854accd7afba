use crate::generator::profile::TrajectoryShape;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trajcore::plugins::PointTransform;
use trajcore::render::{BlendCurve, BlockSizes, ConsumerKind, ResamplerQuality};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransmitterConfig {
    pub name: String,
    #[serde(default)]
    pub shape: TrajectoryShape,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReceiverConfig {
    pub name: String,
    pub center: [f32; 2],
    pub radius: f32,
}

/// What the job does with the trajectories.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobConfig {
    Filter {
        transform: PointTransform,
        #[serde(default)]
        consumer: Option<ConsumerKind>,
        #[serde(default)]
        blend_len: i64,
        #[serde(default)]
        curve: BlendCurve,
    },
    Bounce {
        #[serde(default)]
        target_rate: Option<f64>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub source_rate: f64,
    pub frames: usize,
    #[serde(default)]
    pub block_sizes: BlockSizes,
    #[serde(default)]
    pub quality: ResamplerQuality,
    pub transmitters: Vec<TransmitterConfig>,
    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,
    pub job: JobConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// One orbiting transmitter bounced against two receivers.
    pub fn from_args(frames: usize, source_rate: f64, target_rate: Option<f64>) -> Self {
        Self {
            source_rate,
            frames,
            block_sizes: BlockSizes::default(),
            quality: ResamplerQuality::default(),
            transmitters: vec![TransmitterConfig {
                name: "orbit".into(),
                shape: TrajectoryShape::default(),
            }],
            receivers: vec![
                ReceiverConfig {
                    name: "east".into(),
                    center: [1.0, 0.0],
                    radius: 1.0,
                },
                ReceiverConfig {
                    name: "west".into(),
                    center: [-1.0, 0.0],
                    radius: 1.0,
                },
            ],
            job: JobConfig::Bounce { target_rate },
        }
    }
}
