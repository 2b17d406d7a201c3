//! Pose estimation over the local video feed.
//!
//! The detector produces 17-keypoint poses at ~30 fps for the examining
//! doctor's overlay. Keypoints are simulated until a real model backend is
//! wired in; the lifecycle (load, bind, start, stop) is the real one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Body parts in PoseNet order.
pub const KEYPOINT_PARTS: [&str; 17] = [
    "nose",
    "leftEye",
    "rightEye",
    "leftEar",
    "rightEar",
    "leftShoulder",
    "rightShoulder",
    "leftElbow",
    "rightElbow",
    "leftWrist",
    "rightWrist",
    "leftHip",
    "rightHip",
    "leftKnee",
    "rightKnee",
    "leftAnkle",
    "rightAnkle",
];

/// Limbs drawn between keypoints.
pub const SKELETON: [(&str, &str); 12] = [
    ("leftShoulder", "rightShoulder"),
    ("leftShoulder", "leftElbow"),
    ("leftElbow", "leftWrist"),
    ("rightShoulder", "rightElbow"),
    ("rightElbow", "rightWrist"),
    ("leftShoulder", "leftHip"),
    ("rightShoulder", "rightHip"),
    ("leftHip", "rightHip"),
    ("leftHip", "leftKnee"),
    ("leftKnee", "leftAnkle"),
    ("rightHip", "rightKnee"),
    ("rightKnee", "rightAnkle"),
];

/// Keypoints at or below this score are not drawn.
pub const MIN_KEYPOINT_SCORE: f32 = 0.5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoseError {
    #[error("Pose model is not initialised")]
    NotReady,

    #[error("No video source bound to the pose detector")]
    NoVideoSource,

    #[error("Pose detection already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keypoint {
    pub part: &'static str,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
    pub timestamp_ms: u64,
}

impl Pose {
    pub fn keypoint(&self, part: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.part == part)
    }
}

/// A line of the drawn skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

/// Limb segments whose two endpoints are both confidently detected.
pub fn skeleton_segments(pose: &Pose) -> Vec<Segment> {
    SKELETON
        .iter()
        .filter_map(|(a, b)| {
            let kp1 = pose.keypoint(a)?;
            let kp2 = pose.keypoint(b)?;
            (kp1.score > MIN_KEYPOINT_SCORE && kp2.score > MIN_KEYPOINT_SCORE).then_some(Segment {
                from: (kp1.x, kp1.y),
                to: (kp2.x, kp2.y),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PoseConfig {
    pub model_load_delay: Duration,
    pub frame_interval: Duration,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_load_delay: Duration::from_millis(1500),
            frame_interval: Duration::from_millis(33), // ~30 fps
        }
    }
}

pub struct PoseDetector {
    config: PoseConfig,
    ready: bool,
    video_source: Option<String>,
    canvas: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl PoseDetector {
    pub fn new(config: PoseConfig) -> Self {
        Self {
            config,
            ready: false,
            video_source: None,
            canvas: None,
            task: None,
        }
    }

    /// Load the model. Idempotent.
    pub async fn initialize(&mut self) -> Result<(), PoseError> {
        if self.ready {
            return Ok(());
        }
        tokio::time::sleep(self.config.model_load_delay).await;
        self.ready = true;
        info!("Pose detection model initialised");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_video_source(&mut self, element_id: impl Into<String>) {
        self.video_source = Some(element_id.into());
    }

    pub fn set_canvas(&mut self, canvas_id: impl Into<String>) {
        self.canvas = Some(canvas_id.into());
    }

    pub fn video_source(&self) -> Option<&str> {
        self.video_source.as_deref()
    }

    pub fn canvas(&self) -> Option<&str> {
        self.canvas.as_deref()
    }

    pub fn is_detecting(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start emitting poses on `poses`. The task ends on its own when the
    /// receiver is dropped.
    pub fn start_detection(&mut self, poses: mpsc::Sender<Pose>) -> Result<(), PoseError> {
        if !self.ready {
            return Err(PoseError::NotReady);
        }
        let Some(source) = self.video_source.clone() else {
            return Err(PoseError::NoVideoSource);
        };
        if self.is_detecting() {
            return Err(PoseError::AlreadyRunning);
        }

        let frame_interval = self.config.frame_interval;
        info!(source = %source, "Starting pose detection");

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_interval);
            loop {
                interval.tick().await;
                let pose = simulate_pose();
                match poses.try_send(pose) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Pose channel full, dropping frame");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("Pose receiver dropped, stopping detection");
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    pub fn stop_detection(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Pose detection stopped");
        }
    }
}

impl Default for PoseDetector {
    fn default() -> Self {
        Self::new(PoseConfig::default())
    }
}

impl Drop for PoseDetector {
    fn drop(&mut self) {
        self.stop_detection();
    }
}

fn simulate_pose() -> Pose {
    let mut rng = rand::thread_rng();
    let keypoints = KEYPOINT_PARTS
        .iter()
        .map(|part| Keypoint {
            part: *part,
            x: 200.0 + rng.gen::<f32>() * 200.0,
            y: 100.0 + rng.gen::<f32>() * 400.0,
            score: 0.8 + rng.gen::<f32>() * 0.2,
        })
        .collect();

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    Pose {
        keypoints,
        score: 0.85 + rng.gen::<f32>() * 0.1,
        timestamp_ms,
    }
}
