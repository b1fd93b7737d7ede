pub mod bot;
pub mod config;
pub mod parse;
pub mod sheets;
