pub mod config;
pub mod connection;
pub mod events;
pub mod notice;
pub mod provider;
pub mod session;
pub mod state;
pub mod view;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use connection::{ConnectionDetailsFetcher, DetailsSource, FetchError};
pub use events::SessionEvent;
pub use provider::{NoProvider, ProviderError, ProviderEvent, RoomProvider};
pub use session::{CallSnapshot, ConnectFailure, ConnectOutcome, SessionController, SessionError};
pub use state::{CallState, SessionMode, SessionPhase, SidePanel};
pub use view::{render, Screen};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("telemedx_client=debug,telemedx_media=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
