pub mod countries;
pub mod events;

pub use countries::*;
pub use events::*;
