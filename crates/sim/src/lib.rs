pub mod cohort;
pub mod engine;
pub mod perks;
pub mod phase;
pub mod player;
pub mod profile;
pub mod report;
pub mod runner;
