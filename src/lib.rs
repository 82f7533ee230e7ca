pub mod config;
pub mod delivery;
pub mod exclusion;
pub mod extractor;
pub mod fetcher;
pub mod record;
pub mod runner;
