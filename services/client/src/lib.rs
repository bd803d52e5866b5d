pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;
