pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod tokens;
pub mod tracker;

#[cfg(test)]
mod testing;
