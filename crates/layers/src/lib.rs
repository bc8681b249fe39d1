pub mod boundaries;
pub mod countries;
pub mod globe;
pub mod symbology;

pub use boundaries::*;
pub use countries::*;
pub use globe::*;
pub use symbology::*;
