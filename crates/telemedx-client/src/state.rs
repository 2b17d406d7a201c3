//! Per-call state shared between the session controller and its tasks.
//!
//! [`CallState`] sits behind `Arc<Mutex<>>` so spawned work (demo echoes)
//! can append to it after the controller method that scheduled it has
//! returned. The lock is never held across an `.await`.

use serde::Serialize;

use telemedx_shared::{ChatMessage, ConnectionQuality, ParticipantInfo};

use crate::notice::{ConfirmDialog, Notice, NoticeLevel, NoticeQueue};

/// How a connected session reaches its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Joined a room through the real-time provider.
    Live,
    /// Local camera only, with a canned chat assistant.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "lowercase")]
pub enum SessionPhase {
    Connecting,
    Connected(SessionMode),
    Failed(String),
    Ended,
}

impl SessionPhase {
    pub fn mode(&self) -> Option<SessionMode> {
        match self {
            SessionPhase::Connected(mode) => Some(*mode),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionPhase::Connected(_))
    }
}

/// The one side panel that may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SidePanel {
    Chat,
    Participants,
    Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallState {
    pub phase: SessionPhase,

    /// Camera publishing (live) or local video tracks enabled (simulated).
    pub video_enabled: bool,

    pub audio_enabled: bool,

    /// Only ever true in live mode.
    pub screen_sharing: bool,

    pub side_panel: Option<SidePanel>,

    /// Local and remote messages in arrival order.
    pub chat: Vec<ChatMessage>,

    /// Remote participants as last reported by the provider.
    pub participants: Vec<ParticipantInfo>,

    /// Shown in the call header.
    pub quality: ConnectionQuality,

    /// Set while pose detection is emitting frames.
    pub pose_active: bool,

    /// Identity of the participant whose video fills the remote tile.
    pub remote_video: Option<String>,

    pub notices: NoticeQueue,

    /// Pending confirmation, e.g. ending the call.
    pub dialog: Option<ConfirmDialog>,
}

impl CallState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            video_enabled: true,
            audio_enabled: true,
            screen_sharing: false,
            side_panel: None,
            chat: Vec::new(),
            participants: Vec::new(),
            quality: ConnectionQuality::Good,
            pose_active: false,
            remote_video: None,
            notices: NoticeQueue::default(),
            dialog: None,
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    /// Open `panel`, or close it if it is already the open one.
    pub fn toggle_panel(&mut self, panel: SidePanel) -> Option<SidePanel> {
        self.side_panel = if self.side_panel == Some(panel) {
            None
        } else {
            Some(panel)
        };
        self.side_panel
    }
}

impl Default for CallState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_side_panel() {
        let mut state = CallState::new();
        assert_eq!(state.toggle_panel(SidePanel::Chat), Some(SidePanel::Chat));
        assert_eq!(
            state.toggle_panel(SidePanel::Participants),
            Some(SidePanel::Participants)
        );
        assert_eq!(state.toggle_panel(SidePanel::Participants), None);
    }

    #[test]
    fn test_phase_mode() {
        assert_eq!(
            SessionPhase::Connected(SessionMode::Live).mode(),
            Some(SessionMode::Live)
        );
        assert!(SessionPhase::Failed("x".into()).mode().is_none());
        assert!(!SessionPhase::Ended.is_connected());
    }
}
