use tracing::info;
use crate::models::ResetStateMessage;
use crate::ws::Session;

/// Handle ResetStateMessage
pub async fn handle_reset_state(msg: ResetStateMessage, session: &Session) {
    info!(
        "Reset requested by participant {} ({})",
        session.id(),
        if msg.state.is_some() { "new state" } else { "empty state" }
    );
    session.room().reset(session.id(), msg.state).await;
}
