pub mod api;
pub mod config;
pub mod dispatch;
pub mod state;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
