use tracing::debug;
use crate::models::SubmitDeltaMessage;
use crate::ws::Session;

/// Handle SubmitDeltaMessage
pub async fn handle_submit_delta(msg: SubmitDeltaMessage, session: &Session) {
    debug!(
        "Delta received from participant {}: {} upserts, {} deletions",
        session.id(),
        msg.delta.len(),
        msg.delete_keys.len()
    );

    // Merge, then echo the whole document to everyone including the sender
    session.room().apply_delta(session.id(), msg.delta, &msg.delete_keys).await;
}
