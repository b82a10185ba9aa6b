pub mod health;
pub mod diagnostics;
pub mod messages;

pub use health::*;
pub use diagnostics::*;
pub use messages::*;
