pub mod compare;
pub mod executor;
pub mod fake;
pub mod process;
pub mod result;
pub mod session;

pub use compare::*;
pub use executor::*;
pub use process::*;
pub use result::*;
pub use session::*;
