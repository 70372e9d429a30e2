pub mod commands;
pub mod doctor;
pub mod drift;
pub mod error;
pub mod fs_utils;
pub mod hooks;
pub mod hub;
pub mod manifest;
pub mod paths;
pub mod profiles;
pub mod rollback;
pub mod settings;
pub mod symlink;
pub mod ui;

pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;
