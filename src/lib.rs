pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod images;
pub mod models;
pub mod ui;

#[cfg(test)]
mod testutil;
