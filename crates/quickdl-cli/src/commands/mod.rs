pub mod config;
pub mod doctor;
pub mod get;
pub mod prune;
pub mod serve;
