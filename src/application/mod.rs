//! Application layer: port traits and the provisioning use-cases.

pub mod ports;
pub mod services;
