pub mod config;
pub mod event_bus;
pub mod frame;

pub use config::*;
pub use event_bus::*;
pub use frame::*;
