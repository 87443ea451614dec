pub mod error;
pub mod vault;

pub use error::*;
pub use vault::*;
