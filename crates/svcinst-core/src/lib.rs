pub mod command;
pub mod certificate;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod identity;
pub mod paths;
pub mod registry;
pub mod relocation;
pub mod service;
pub mod simple;
pub mod state;
pub mod state_db;

#[cfg(test)]
mod testing;

pub use error::{InstallError, Result};
