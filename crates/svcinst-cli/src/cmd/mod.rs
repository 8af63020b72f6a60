pub mod config;
pub mod install;
pub mod order;
pub mod state;
pub mod status;
pub mod uninstall;
