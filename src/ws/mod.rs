pub mod coordinator;
pub mod session;
pub mod signal;
pub mod transport;

pub use coordinator::{Room, RoomOptions, RoomStats};
pub use session::Session;
pub use transport::{EventReceiver, EventSender, Transport};
