//! Presentation shell.
//!
//! [`render`] turns a [`CallSnapshot`] into a description of what the call
//! page shows. It is pure: front ends diff the returned [`Screen`] and draw
//! it with whatever toolkit they use.

use serde::Serialize;

use telemedx_media::Segment;
use telemedx_shared::routes::Route;
use telemedx_shared::{ChatMessage, ConnectionQuality, Role};

use crate::notice::{ConfirmDialog, Notice};
use crate::session::{CallSnapshot, POSE_CANVAS_ID};
use crate::state::{SessionMode, SessionPhase, SidePanel};

pub const WAITING_FOR_PARTICIPANT: &str = "Waiting for participant...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "lowercase")]
pub enum Screen {
    Connecting { title: String, subtitle: String },
    Failed { message: String, actions: Vec<FailedAction> },
    Call(Box<CallView>),
    Ended { redirect: Route },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailedAction {
    GoBack(Route),
    Retry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallView {
    pub header: Header,
    pub remote: RemoteTile,
    pub local: LocalTile,
    pub controls: Vec<Control>,
    pub side_panel: Option<PanelView>,
    pub dialog: Option<ConfirmDialog>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub room_name: String,
    pub quality: ConnectionQuality,
    pub duration: String,
    /// Shown while the call runs without a live provider.
    pub mode_badge: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RemoteTile {
    Video { participant: String },
    Waiting { message: &'static str, participant_count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalTile {
    pub video_element: String,
    pub camera_off: bool,
    pub pose_overlay: Option<PoseOverlay>,
}

/// Canvas drawn over the local video for pose analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseOverlay {
    pub canvas_id: &'static str,
    pub video_source: String,
    pub active: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlKind {
    Microphone,
    Camera,
    EndCall,
    ScreenShare,
    Chat,
    Participants,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Control {
    pub kind: ControlKind,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PanelView {
    Chat { messages: Vec<ChatMessage> },
    Participants { entries: Vec<ParticipantEntry>, others: usize },
    Settings { ai_features: Option<AiFeatures> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantEntry {
    pub name: String,
    pub role: Role,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiFeatures {
    pub pose_detection_active: bool,
}

pub fn render(snapshot: &CallSnapshot) -> Screen {
    let descriptor = &snapshot.descriptor;
    let state = &snapshot.state;

    match &state.phase {
        SessionPhase::Connecting => Screen::Connecting {
            title: "Connecting to consultation...".into(),
            subtitle: format!("Room: {}", descriptor.room_name()),
        },
        SessionPhase::Failed(reason) => Screen::Failed {
            message: format!("Connection failed: {reason}"),
            actions: vec![
                FailedAction::GoBack(Route::dashboard(descriptor.participant_role())),
                FailedAction::Retry,
            ],
        },
        SessionPhase::Ended => Screen::Ended {
            redirect: Route::dashboard(descriptor.participant_role()),
        },
        SessionPhase::Connected(mode) => Screen::Call(Box::new(call_view(snapshot, *mode))),
    }
}

fn call_view(snapshot: &CallSnapshot, mode: SessionMode) -> CallView {
    let descriptor = &snapshot.descriptor;
    let state = &snapshot.state;

    let header = Header {
        room_name: descriptor.room_name().to_string(),
        quality: state.quality,
        duration: format_duration(snapshot.duration_secs),
        mode_badge: (mode == SessionMode::Simulated).then_some("Demo Mode"),
    };

    let remote = match &state.remote_video {
        Some(participant) => RemoteTile::Video {
            participant: participant.clone(),
        },
        None => RemoteTile::Waiting {
            message: WAITING_FOR_PARTICIPANT,
            participant_count: state.participants.len(),
        },
    };

    // Mounted whenever the session allows pose analysis so the detector
    // always has a canvas to draw on.
    let pose_overlay = descriptor.pose_detection_enabled().then(|| PoseOverlay {
        canvas_id: POSE_CANVAS_ID,
        video_source: snapshot.local_video.id.clone(),
        active: state.pose_active,
        segments: snapshot.pose_segments.clone(),
    });

    let local = LocalTile {
        video_element: snapshot.local_video.id.clone(),
        camera_off: !state.video_enabled,
        pose_overlay,
    };

    let panel_open = |panel: SidePanel| state.side_panel == Some(panel);
    let controls = vec![
        Control { kind: ControlKind::Microphone, active: state.audio_enabled },
        Control { kind: ControlKind::Camera, active: state.video_enabled },
        Control { kind: ControlKind::EndCall, active: false },
        Control { kind: ControlKind::ScreenShare, active: state.screen_sharing },
        Control { kind: ControlKind::Chat, active: panel_open(SidePanel::Chat) },
        Control { kind: ControlKind::Participants, active: panel_open(SidePanel::Participants) },
        Control { kind: ControlKind::Settings, active: panel_open(SidePanel::Settings) },
    ];

    let side_panel = state.side_panel.map(|panel| match panel {
        SidePanel::Chat => PanelView::Chat {
            messages: state.chat.clone(),
        },
        SidePanel::Participants => {
            let mut entries = vec![ParticipantEntry {
                name: format!("{} (You)", descriptor.participant_name()),
                role: descriptor.participant_role(),
                is_local: true,
            }];
            entries.extend(state.participants.iter().map(|p| ParticipantEntry {
                name: p.name.clone(),
                role: p.role,
                is_local: false,
            }));
            PanelView::Participants {
                entries,
                others: state.participants.len(),
            }
        }
        SidePanel::Settings => PanelView::Settings {
            ai_features: descriptor.pose_detection_enabled().then_some(AiFeatures {
                pose_detection_active: state.pose_active,
            }),
        },
    });

    CallView {
        header,
        remote,
        local,
        controls,
        side_panel,
        dialog: state.dialog.clone(),
        notices: state.notices.iter().cloned().collect(),
    }
}

/// `m:ss` under an hour, `h:mm:ss` after.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
