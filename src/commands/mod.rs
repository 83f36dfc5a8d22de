//! Command implementations

pub mod install;
pub mod menu;
pub mod status;
pub mod uninstall;
