//! Application services — the provisioning use-cases.

pub mod credential;
pub mod install;
pub mod uninstall;

#[cfg(test)]
pub(crate) mod test_support;
