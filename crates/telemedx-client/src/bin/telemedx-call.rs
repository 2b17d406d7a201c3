//! Headless call driver.
//!
//! Joins a consultation described by a `/video-call` query string, sends
//! any chat lines given on the command line and prints each rendered
//! screen as JSON.
//!
//! ```text
//! telemedx-call "?room=cardio-7&name=Dr%20Lee&role=doctor" "Hello"
//! ```

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use telemedx_client::{init_tracing, render, ClientConfig, ConnectOutcome, SessionController};
use telemedx_shared::SessionDescriptor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_default();
    let messages: Vec<String> = args.collect();

    let config = ClientConfig::from_env();
    let descriptor = SessionDescriptor::from_query(&query, Utc::now());
    info!(
        room = %descriptor.room_name(),
        role = %descriptor.participant_role(),
        "Starting headless call"
    );

    let echo_delay = config.demo_echo_delay;
    let mut session = SessionController::headless(descriptor, config);
    print_screen(&session)?;

    if let ConnectOutcome::Failed(failure) = session.connect().await? {
        anyhow::bail!("could not join room: {failure}");
    }
    print_screen(&session)?;

    for message in &messages {
        session.send_chat(message).await?;
    }
    if !messages.is_empty() {
        tokio::time::sleep(echo_delay + Duration::from_millis(100)).await;
        session.toggle_chat();
        print_screen(&session)?;
    }

    session.disconnect().await;
    print_screen(&session)?;
    Ok(())
}

fn print_screen(session: &SessionController) -> anyhow::Result<()> {
    let screen = render(&session.snapshot());
    println!("{}", serde_json::to_string_pretty(&screen)?);
    Ok(())
}
