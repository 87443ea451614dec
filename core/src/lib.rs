pub mod action;
pub mod config;
pub mod lang;
pub mod model;
pub mod report;
pub mod storage;
pub mod style;
pub mod template;
pub mod testing;

pub use crate::action::error;
pub use crate::config::Config;
