pub mod app;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod resolve;
pub mod table;
