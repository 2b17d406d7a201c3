use serde::Serialize;
use tokio::sync::broadcast;

use telemedx_shared::ChatMessage;

use crate::notice::Notice;
use crate::state::SessionPhase;

pub const EVENT_PHASE_CHANGED: &str = "phase-changed";
pub const EVENT_CHAT_APPENDED: &str = "chat-appended";
pub const EVENT_PARTICIPANTS_CHANGED: &str = "participants-changed";
pub const EVENT_NOTICE: &str = "notice";

/// Events a front end subscribes to instead of polling snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    ChatAppended(ChatMessage),
    ParticipantsChanged { count: usize },
    Notice(Notice),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PhaseChanged(_) => EVENT_PHASE_CHANGED,
            SessionEvent::ChatAppended(_) => EVENT_CHAT_APPENDED,
            SessionEvent::ParticipantsChanged { .. } => EVENT_PARTICIPANTS_CHANGED,
            SessionEvent::Notice(_) => EVENT_NOTICE,
        }
    }
}

pub fn emit_event(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    let name = event.name();
    // No subscribers is normal for headless sessions.
    if events.send(event).is_err() {
        tracing::trace!(event = name, "No event subscribers");
    }
}
