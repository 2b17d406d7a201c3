// Local media capture and analysis for the call client.

pub mod devices;
pub mod pose;

pub use devices::{
    HeadlessDevices, LocalMediaStream, MediaConstraints, MediaDevices, MediaError, MediaTrack,
    TrackKind, VideoElement,
};
pub use pose::{skeleton_segments, Pose, PoseConfig, PoseDetector, PoseError, Segment};
