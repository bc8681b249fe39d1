pub mod camera;
pub mod controller;
pub mod hover;
pub mod picking;
pub mod rotation;
pub mod selection;
pub mod spatial;

pub use controller::*;
