pub mod config;
pub mod event;
pub mod message;

pub use config::*;
pub use event::*;
pub use message::*;
