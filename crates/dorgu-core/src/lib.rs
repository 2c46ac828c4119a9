pub mod analysis;
pub mod app_config;
pub mod config;
pub mod error;
pub mod global;
pub mod io;
pub mod manifest;
pub mod merge;
pub mod paths;
pub mod quantity;
pub mod validate;

pub use error::{DorguError, Result};
