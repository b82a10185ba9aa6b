pub mod handler;
pub mod msg_delta_handler;
pub mod msg_reset_handler;
pub mod msg_saved_state_handler;
