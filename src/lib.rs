pub mod auth;
pub mod config;
pub mod consts;
pub mod control;
pub mod error;
pub mod logging;
pub mod toggle;

pub use error::{Error, ErrorKind};
