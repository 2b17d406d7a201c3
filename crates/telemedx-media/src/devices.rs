use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission to use media devices was denied")]
    PermissionDenied,

    #[error("No {0} device available")]
    NoDevice(TrackKind),

    #[error("Media capture error: {0}")]
    CaptureError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Which devices to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    pub fn camera_and_microphone() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// One capture track. Disabling a track mutes it in place; only `stop`
/// ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub enabled: bool,
    pub ended: bool,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            enabled: true,
            ended: false,
        }
    }

    pub fn stop(&mut self) {
        self.ended = true;
        self.enabled = false;
    }
}

/// Local capture stream owned by exactly one call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMediaStream {
    pub id: String,
    tracks: Vec<MediaTrack>,
}

impl LocalMediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    pub fn video_tracks_mut(&mut self) -> impl Iterator<Item = &mut MediaTrack> {
        self.tracks.iter_mut().filter(|t| t.kind == TrackKind::Video)
    }

    pub fn audio_tracks_mut(&mut self) -> impl Iterator<Item = &mut MediaTrack> {
        self.tracks.iter_mut().filter(|t| t.kind == TrackKind::Audio)
    }

    /// Set `enabled` on every live track of one kind. Returns how many
    /// tracks were touched.
    pub fn set_kind_enabled(&mut self, kind: TrackKind, enabled: bool) -> usize {
        let mut touched = 0;
        let tracks: Box<dyn Iterator<Item = &mut MediaTrack>> = match kind {
            TrackKind::Video => Box::new(self.video_tracks_mut()),
            TrackKind::Audio => Box::new(self.audio_tracks_mut()),
        };
        for track in tracks.filter(|t| !t.ended) {
            track.enabled = enabled;
            touched += 1;
        }
        debug!(%kind, enabled, touched, "Local track state changed");
        touched
    }

    /// Release every track.
    pub fn stop(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
        debug!(stream = %self.id, "Local media stream stopped");
    }

    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| !t.ended)
    }
}

/// A rendering surface a stream can be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoElement {
    pub id: String,
    pub src: Option<String>,
    pub muted: bool,
}

impl VideoElement {
    pub fn new(id: impl Into<String>, muted: bool) -> Self {
        Self {
            id: id.into(),
            src: None,
            muted,
        }
    }

    pub fn attach(&mut self, stream: &LocalMediaStream) {
        self.src = Some(stream.id.clone());
    }

    pub fn attach_remote(&mut self, source: impl Into<String>) {
        self.src = Some(source.into());
    }

    pub fn detach(&mut self) {
        self.src = None;
    }

    pub fn is_attached(&self) -> bool {
        self.src.is_some()
    }
}

/// Access to local capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<LocalMediaStream, MediaError>;
}

/// Synthetic devices for headless runs and tests.
#[derive(Debug, Clone)]
pub struct HeadlessDevices {
    pub has_camera: bool,
    pub has_microphone: bool,
    pub permission_granted: bool,
}

impl Default for HeadlessDevices {
    fn default() -> Self {
        Self {
            has_camera: true,
            has_microphone: true,
            permission_granted: true,
        }
    }
}

impl HeadlessDevices {
    pub fn denied() -> Self {
        Self {
            permission_granted: false,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaDevices for HeadlessDevices {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<LocalMediaStream, MediaError> {
        if !self.permission_granted {
            return Err(MediaError::PermissionDenied);
        }

        let mut tracks = Vec::new();
        if constraints.video {
            if !self.has_camera {
                return Err(MediaError::NoDevice(TrackKind::Video));
            }
            tracks.push(MediaTrack::new(TrackKind::Video, "Headless Camera"));
        }
        if constraints.audio {
            if !self.has_microphone {
                return Err(MediaError::NoDevice(TrackKind::Audio));
            }
            tracks.push(MediaTrack::new(TrackKind::Audio, "Headless Microphone"));
        }

        let stream = LocalMediaStream::new(tracks);
        info!(
            stream = %stream.id,
            tracks = stream.tracks().len(),
            "Acquired headless media stream"
        );
        Ok(stream)
    }
}
