pub mod config;
pub mod content;
pub mod result;
pub mod stat;
