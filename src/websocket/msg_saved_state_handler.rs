use tracing::info;
use crate::models::AddSavedStateMessage;
use crate::ws::Session;

/// Handle AddSavedStateMessage
pub async fn handle_add_saved_state(msg: AddSavedStateMessage, session: &Session) {
    info!("Saved state '{}' received from participant {}", msg.name, session.id());

    // Persisting happens in the background; everyone sees the new catalog right away
    if let Some(generation) = session.room().add_saved_state(session.id(), msg.name, msg.state).await {
        info!("Saved states queued for writing (generation {})", generation);
    }
}
