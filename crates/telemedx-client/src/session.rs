//! Room-session controller.
//!
//! One controller drives one call page: it joins the room through the
//! installed [`RoomProvider`], or runs a simulated session with the local
//! camera when none is installed, and owns every resource the call opens
//! (local capture, echo timers, pose detection). A live connection failure
//! is reported as [`ConnectOutcome::Failed`]; falling back to the simulated
//! session is a separate, explicit call ([`SessionController::connect_or_degrade`]).

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use telemedx_media::{
    skeleton_segments, HeadlessDevices, LocalMediaStream, MediaConstraints, MediaDevices, Pose,
    PoseDetector, PoseError, Segment, TrackKind, VideoElement,
};
use telemedx_shared::constants::DEMO_ASSISTANT_NAME;
use telemedx_shared::protocol::DataPacket;
use telemedx_shared::routes::Route;
use telemedx_shared::{ChatMessage, SessionDescriptor};

use crate::config::ClientConfig;
use crate::connection::{ConnectionDetailsFetcher, DetailsSource, FetchError};
use crate::events::{emit_event, SessionEvent};
use crate::notice::{ConfirmDialog, NoticeLevel};
use crate::provider::{NoProvider, ProviderError, ProviderEvent, RoomProvider};
use crate::state::{CallState, SessionMode, SessionPhase, SidePanel};

pub const LOCAL_VIDEO_ID: &str = "local-video";
pub const POSE_CANVAS_ID: &str = "pose-canvas";

const POSE_BUFFER: usize = 8;
const EVENT_BUFFER: usize = 64;

/// Why joining the live room failed.
#[derive(Error, Debug)]
pub enum ConnectFailure {
    #[error("could not get connection details: {0}")]
    Details(#[from] FetchError),

    #[error("room provider error: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug)]
pub enum ConnectOutcome {
    Connected(SessionMode),
    Failed(ConnectFailure),
    /// Live connection failed and the caller chose to continue simulated.
    Degraded(ConnectFailure),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is already connected")]
    AlreadyActive,

    #[error("Session is not connected")]
    NotConnected,

    #[error("Session has ended")]
    Ended,

    #[error("Pose detection is not enabled for this session")]
    PoseUnavailable,

    #[error("No end-call confirmation is pending")]
    NoPendingConfirmation,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error("Failed to encode data packet: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything the presentation shell renders, captured at one instant.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub descriptor: SessionDescriptor,
    pub state: CallState,
    pub duration_secs: u64,
    pub local_video: VideoElement,
    /// Skeleton of the most recent pose, empty while detection is off.
    pub pose_segments: Vec<Segment>,
}

fn lock_state(state: &Mutex<CallState>) -> MutexGuard<'_, CallState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SessionController {
    descriptor: SessionDescriptor,
    config: ClientConfig,
    provider: Arc<dyn RoomProvider>,
    details: Arc<dyn DetailsSource>,
    devices: Arc<dyn MediaDevices>,
    state: Arc<Mutex<CallState>>,
    events: broadcast::Sender<SessionEvent>,
    provider_events: Option<broadcast::Receiver<ProviderEvent>>,
    local_stream: Option<LocalMediaStream>,
    local_video: VideoElement,
    pose: PoseDetector,
    pose_rx: Option<mpsc::Receiver<Pose>>,
    last_pose: Option<Pose>,
    echo_tasks: Vec<JoinHandle<()>>,
    connected_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl SessionController {
    pub fn new(
        descriptor: SessionDescriptor,
        config: ClientConfig,
        provider: Arc<dyn RoomProvider>,
        details: Arc<dyn DetailsSource>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            pose: PoseDetector::new(config.pose.clone()),
            descriptor,
            config,
            provider,
            details,
            devices,
            state: Arc::new(Mutex::new(CallState::new())),
            events,
            provider_events: None,
            local_stream: None,
            local_video: VideoElement::new(LOCAL_VIDEO_ID, true),
            pose_rx: None,
            last_pose: None,
            echo_tasks: Vec::new(),
            connected_at: None,
            ended_at: None,
        }
    }

    /// A controller with no room provider and synthetic devices. Connecting
    /// always yields a simulated session.
    pub fn headless(descriptor: SessionDescriptor, config: ClientConfig) -> Self {
        let details = Arc::new(ConnectionDetailsFetcher::from_config(&config));
        Self::new(
            descriptor,
            config,
            Arc::new(NoProvider),
            details,
            Arc::new(HeadlessDevices::default()),
        )
    }

    pub fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase.clone()
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.lock().phase.mode()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn local_stream(&self) -> Option<&LocalMediaStream> {
        self.local_stream.as_ref()
    }

    pub fn pose_detector(&self) -> &PoseDetector {
        &self.pose
    }

    fn lock(&self) -> MutexGuard<'_, CallState> {
        lock_state(&self.state)
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.lock().phase = phase.clone();
        debug!(room = %self.descriptor.room_name(), ?phase, "Session phase changed");
        emit_event(&self.events, SessionEvent::PhaseChanged(phase));
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = {
            let mut state = self.lock();
            state.notify(level, message);
            state.notices.latest().cloned()
        };
        if let Some(notice) = notice {
            emit_event(&self.events, SessionEvent::Notice(notice));
        }
    }

    fn append_chat(&self, message: ChatMessage) {
        self.lock().chat.push(message.clone());
        emit_event(&self.events, SessionEvent::ChatAppended(message));
    }

    fn ensure_connected(&self) -> Result<SessionMode, SessionError> {
        match self.lock().phase {
            SessionPhase::Connected(mode) => Ok(mode),
            SessionPhase::Ended => Err(SessionError::Ended),
            _ => Err(SessionError::NotConnected),
        }
    }

    // -----------------------------------------------------------------------
    // Connecting
    // -----------------------------------------------------------------------

    /// Join the room. Without an installed provider this runs the simulated
    /// session instead and never touches the provider again.
    ///
    /// `&mut self` rules out overlapping attempts; a second call after a
    /// successful connect returns [`SessionError::AlreadyActive`]. A failed
    /// attempt may be retried.
    pub async fn connect(&mut self) -> Result<ConnectOutcome, SessionError> {
        match self.phase() {
            SessionPhase::Connected(_) => return Err(SessionError::AlreadyActive),
            SessionPhase::Ended => return Err(SessionError::Ended),
            SessionPhase::Connecting | SessionPhase::Failed(_) => {}
        }
        self.set_phase(SessionPhase::Connecting);

        if !self.provider.is_available() {
            info!(
                room = %self.descriptor.room_name(),
                "No room provider installed, starting simulated session"
            );
            self.run_simulated().await;
            return Ok(ConnectOutcome::Connected(SessionMode::Simulated));
        }

        match self.connect_live().await {
            Ok(()) => Ok(ConnectOutcome::Connected(SessionMode::Live)),
            Err(failure) => {
                error!(
                    room = %self.descriptor.room_name(),
                    error = %failure,
                    "Failed to join room"
                );
                self.set_phase(SessionPhase::Failed(failure.to_string()));
                Ok(ConnectOutcome::Failed(failure))
            }
        }
    }

    /// [`connect`](Self::connect), continuing in a simulated session when
    /// the live connection fails.
    pub async fn connect_or_degrade(&mut self) -> Result<ConnectOutcome, SessionError> {
        match self.connect().await? {
            ConnectOutcome::Failed(failure) => {
                warn!(error = %failure, "Live connection failed, continuing in demo mode");
                self.notify(
                    NoticeLevel::Warning,
                    format!("Live connection failed ({failure}). Running in demo mode."),
                );
                self.start_simulated().await?;
                Ok(ConnectOutcome::Degraded(failure))
            }
            outcome => Ok(outcome),
        }
    }

    /// Run the simulated session directly.
    pub async fn start_simulated(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            SessionPhase::Connected(_) => return Err(SessionError::AlreadyActive),
            SessionPhase::Ended => return Err(SessionError::Ended),
            SessionPhase::Connecting | SessionPhase::Failed(_) => {}
        }
        self.set_phase(SessionPhase::Connecting);
        self.run_simulated().await;
        Ok(())
    }

    async fn connect_live(&mut self) -> Result<(), ConnectFailure> {
        let details = self.details.existing_or_refresh().await?;
        let server_url = if details.server_url.is_empty() {
            self.config.livekit_url.as_str()
        } else {
            details.server_url.as_str()
        };

        self.provider
            .connect(server_url, &details.participant_token)
            .await?;
        let provider_events = self.provider.subscribe();

        if let Err(e) = self.publish_local_tracks().await {
            self.provider.disconnect().await;
            return Err(e.into());
        }

        self.provider_events = Some(provider_events);
        self.local_video.attach_remote(details.participant_name.clone());
        self.lock().participants = self.provider.participants();

        info!(
            room = %details.room_name,
            server = %server_url,
            "Joined live room"
        );
        self.mark_connected(SessionMode::Live);
        Ok(())
    }

    async fn publish_local_tracks(&self) -> Result<(), ProviderError> {
        self.provider.set_camera_enabled(true).await?;
        self.provider.set_microphone_enabled(true).await
    }

    async fn run_simulated(&mut self) {
        tokio::time::sleep(self.config.demo_connect_delay).await;

        match self
            .devices
            .get_user_media(MediaConstraints::camera_and_microphone())
            .await
        {
            Ok(stream) => {
                self.local_video.attach(&stream);
                debug!(stream = %stream.id, "Local preview attached");
                self.local_stream = Some(stream);
            }
            Err(e) => {
                warn!(error = %e, "Local media unavailable, continuing without a preview");
                self.notify(
                    NoticeLevel::Warning,
                    format!("Camera and microphone unavailable: {e}"),
                );
            }
        }
        self.mark_connected(SessionMode::Simulated);
    }

    fn mark_connected(&mut self, mode: SessionMode) {
        self.connected_at = Some(Instant::now());
        if self.descriptor.pose_detection_enabled() {
            self.pose.set_video_source(LOCAL_VIDEO_ID);
            self.pose.set_canvas(POSE_CANVAS_ID);
        }
        self.set_phase(SessionPhase::Connected(mode));
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    /// Flip the camera. Returns the new state.
    pub async fn toggle_camera(&mut self) -> Result<bool, SessionError> {
        self.toggle_track(TrackKind::Video).await
    }

    /// Flip the microphone. Returns the new state.
    pub async fn toggle_microphone(&mut self) -> Result<bool, SessionError> {
        self.toggle_track(TrackKind::Audio).await
    }

    async fn toggle_track(&mut self, kind: TrackKind) -> Result<bool, SessionError> {
        let mode = self.ensure_connected()?;
        let enabled = {
            let state = self.lock();
            !match kind {
                TrackKind::Video => state.video_enabled,
                TrackKind::Audio => state.audio_enabled,
            }
        };

        match mode {
            SessionMode::Live => {
                let result = match kind {
                    TrackKind::Video => self.provider.set_camera_enabled(enabled).await,
                    TrackKind::Audio => self.provider.set_microphone_enabled(enabled).await,
                };
                if let Err(e) = result {
                    warn!(%kind, error = %e, "Provider rejected track toggle");
                    self.notify(NoticeLevel::Error, format!("Could not switch {kind}: {e}"));
                    return Err(e.into());
                }
            }
            SessionMode::Simulated => {
                if let Some(stream) = self.local_stream.as_mut() {
                    stream.set_kind_enabled(kind, enabled);
                }
            }
        }

        {
            let mut state = self.lock();
            match kind {
                TrackKind::Video => state.video_enabled = enabled,
                TrackKind::Audio => state.audio_enabled = enabled,
            }
        }
        info!(%kind, enabled, "Local track toggled");
        Ok(enabled)
    }

    /// Start or stop screen sharing. Simulated sessions cannot share; they
    /// get an informational notice and the flag stays as it was.
    pub async fn toggle_screen_share(&mut self) -> Result<bool, SessionError> {
        let mode = self.ensure_connected()?;
        let sharing = self.lock().screen_sharing;

        if mode == SessionMode::Simulated {
            self.notify(
                NoticeLevel::Info,
                "Screen sharing needs a live room connection",
            );
            return Ok(sharing);
        }

        if let Err(e) = self.provider.set_screen_share_enabled(!sharing).await {
            warn!(error = %e, "Provider rejected screen share toggle");
            self.notify(NoticeLevel::Error, format!("Could not switch screen share: {e}"));
            return Err(e.into());
        }
        self.lock().screen_sharing = !sharing;
        info!(sharing = !sharing, "Screen share toggled");
        Ok(!sharing)
    }

    pub fn toggle_chat(&self) -> Option<SidePanel> {
        self.lock().toggle_panel(SidePanel::Chat)
    }

    pub fn toggle_participants(&self) -> Option<SidePanel> {
        self.lock().toggle_panel(SidePanel::Participants)
    }

    pub fn toggle_settings(&self) -> Option<SidePanel> {
        self.lock().toggle_panel(SidePanel::Settings)
    }

    pub fn dismiss_notice(&self, index: usize) {
        self.lock().notices.dismiss(index);
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Send a chat line. Blank input is ignored and returns `Ok(false)`.
    ///
    /// The line is shown locally before it is published, and stays even if
    /// publishing fails.
    pub async fn send_chat(&mut self, text: &str) -> Result<bool, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let mode = self.ensure_connected()?;

        let sender = self.descriptor.participant_name().to_string();
        self.append_chat(ChatMessage::new(sender.clone(), text));

        match mode {
            SessionMode::Live => {
                let payload = DataPacket::chat(&sender, text).to_bytes()?;
                if let Err(e) = self.provider.publish_data(payload).await {
                    warn!(error = %e, "Failed to publish chat message");
                    self.notify(NoticeLevel::Error, format!("Message not delivered: {e}"));
                    return Err(e.into());
                }
            }
            SessionMode::Simulated => self.schedule_echo(text),
        }
        Ok(true)
    }

    fn schedule_echo(&mut self, text: &str) {
        let reply = format!(
            "Message received: \"{text}\" (Demo mode - connect a live provider for real-time chat)"
        );
        let delay = self.config.demo_echo_delay;
        let state = self.state.clone();
        let events = self.events.clone();

        self.echo_tasks.retain(|task| !task.is_finished());
        self.echo_tasks.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let message = ChatMessage::new(DEMO_ASSISTANT_NAME, reply);
            lock_state(&state).chat.push(message.clone());
            emit_event(&events, SessionEvent::ChatAppended(message));
        }));
    }

    // -----------------------------------------------------------------------
    // Provider events
    // -----------------------------------------------------------------------

    /// Apply every provider event received since the last call. Returns how
    /// many were applied.
    pub fn drain_provider_events(&mut self) -> usize {
        let Some(rx) = self.provider_events.as_mut() else {
            return 0;
        };

        let mut pending = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => pending.push(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Provider events dropped before they were applied");
                }
                Err(_) => break,
            }
        }

        let mut applied = 0;
        for event in pending {
            if self.phase() == SessionPhase::Ended {
                debug!("Session ended, ignoring remaining provider events");
                break;
            }
            self.apply_provider_event(event);
            applied += 1;
        }
        applied
    }

    fn apply_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::ParticipantConnected(info) => {
                info!(identity = %info.identity, "Participant joined");
                self.refresh_participants();
            }
            ProviderEvent::ParticipantDisconnected(identity) => {
                info!(identity = %identity, "Participant left");
                {
                    let mut state = self.lock();
                    if state.remote_video.as_deref() == Some(identity.as_str()) {
                        state.remote_video = None;
                    }
                }
                self.refresh_participants();
            }
            ProviderEvent::DataReceived { payload, from } => match DataPacket::decode(&payload) {
                Some(DataPacket::Chat(packet)) => {
                    let sender = from.as_deref().unwrap_or("Unknown");
                    self.append_chat(packet.into_message(sender));
                }
                None => debug!(bytes = payload.len(), "Ignoring unrecognised data packet"),
            },
            ProviderEvent::TrackSubscribed {
                kind: TrackKind::Video,
                participant,
            } => {
                debug!(participant = %participant, "Remote video attached");
                self.lock().remote_video = Some(participant);
            }
            ProviderEvent::TrackUnsubscribed {
                kind: TrackKind::Video,
                participant,
            } => {
                let mut state = self.lock();
                if state.remote_video.as_deref() == Some(participant.as_str()) {
                    state.remote_video = None;
                }
            }
            ProviderEvent::TrackSubscribed { .. } | ProviderEvent::TrackUnsubscribed { .. } => {}
            ProviderEvent::ConnectionQualityChanged { identity, quality } => {
                let mut state = self.lock();
                state.quality = quality;
                if let Some(p) = state.participants.iter_mut().find(|p| p.identity == identity) {
                    p.connection_quality = quality;
                }
            }
            ProviderEvent::Reconnecting => {
                warn!("Room connection lost, provider reconnecting");
                self.notify(NoticeLevel::Warning, "Connection lost. Reconnecting...");
            }
            ProviderEvent::Reconnected => {
                info!("Room connection restored");
                self.notify(NoticeLevel::Info, "Reconnected");
            }
            ProviderEvent::Disconnected => {
                info!(room = %self.descriptor.room_name(), "Room closed by provider");
                self.release_resources();
                self.ended_at = Some(Instant::now());
                self.set_phase(SessionPhase::Ended);
            }
        }
    }

    fn refresh_participants(&self) {
        let participants = self.provider.participants();
        let count = participants.len();
        self.lock().participants = participants;
        emit_event(&self.events, SessionEvent::ParticipantsChanged { count });
    }

    // -----------------------------------------------------------------------
    // Pose detection
    // -----------------------------------------------------------------------

    /// Start or stop pose detection on the local video. Returns whether
    /// detection is now running.
    pub async fn toggle_pose_detection(&mut self) -> Result<bool, SessionError> {
        if !self.descriptor.pose_detection_enabled() {
            return Err(SessionError::PoseUnavailable);
        }
        self.ensure_connected()?;

        if self.pose.is_detecting() {
            self.stop_pose();
            info!("Pose detection disabled");
            return Ok(false);
        }

        self.pose.initialize().await?;
        let (tx, rx) = mpsc::channel(POSE_BUFFER);
        self.pose.start_detection(tx)?;
        self.pose_rx = Some(rx);
        self.lock().pose_active = true;
        info!("Pose detection enabled");
        Ok(true)
    }

    /// Take the newest pose from the detector, if any arrived.
    pub fn poll_pose(&mut self) -> Option<&Pose> {
        if let Some(rx) = self.pose_rx.as_mut() {
            while let Ok(pose) = rx.try_recv() {
                self.last_pose = Some(pose);
            }
        }
        self.last_pose.as_ref()
    }

    fn stop_pose(&mut self) {
        self.pose.stop_detection();
        self.pose_rx = None;
        self.last_pose = None;
        self.lock().pose_active = false;
    }

    // -----------------------------------------------------------------------
    // Ending the call
    // -----------------------------------------------------------------------

    /// Ask for confirmation before ending the call.
    pub fn request_end_call(&self) {
        self.lock().dialog = Some(ConfirmDialog::end_consultation());
    }

    pub fn cancel_end_call(&self) {
        self.lock().dialog = None;
    }

    /// End the call after [`request_end_call`](Self::request_end_call).
    /// Returns the dashboard to navigate to.
    pub async fn confirm_end_call(&mut self) -> Result<Route, SessionError> {
        if self.lock().dialog.take().is_none() {
            return Err(SessionError::NoPendingConfirmation);
        }
        self.disconnect().await;
        Ok(Route::dashboard(self.descriptor.participant_role()))
    }

    /// Release everything the call holds. Idempotent.
    pub async fn disconnect(&mut self) {
        if self.phase() == SessionPhase::Ended {
            return;
        }
        let was_live = self.mode() == Some(SessionMode::Live);

        self.release_resources();
        if was_live {
            self.provider.disconnect().await;
        }

        self.ended_at = Some(Instant::now());
        self.set_phase(SessionPhase::Ended);
        info!(room = %self.descriptor.room_name(), "Call ended");
    }

    fn release_resources(&mut self) {
        for task in self.echo_tasks.drain(..) {
            task.abort();
        }
        self.stop_pose();
        if let Some(stream) = self.local_stream.as_mut() {
            stream.stop();
        }
        self.local_video.detach();
        self.provider_events = None;

        let mut state = self.lock();
        state.remote_video = None;
        state.screen_sharing = false;
        state.dialog = None;
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    pub fn call_duration(&self) -> Duration {
        match self.connected_at {
            Some(start) => self
                .ended_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            descriptor: self.descriptor.clone(),
            state: self.lock().clone(),
            duration_secs: self.call_duration().as_secs(),
            local_video: self.local_video.clone(),
            pose_segments: self
                .last_pose
                .as_ref()
                .map(skeleton_segments)
                .unwrap_or_default(),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let was_live = self.mode() == Some(SessionMode::Live);
        self.release_resources();
        if !was_live {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!(
                    room = %self.descriptor.room_name(),
                    "Session dropped while live, leaving room"
                );
                let provider = self.provider.clone();
                handle.spawn(async move {
                    provider.disconnect().await;
                });
            }
            Err(_) => warn!(
                room = %self.descriptor.room_name(),
                "Session dropped outside a runtime, room provider left connected"
            ),
        }
    }
}
