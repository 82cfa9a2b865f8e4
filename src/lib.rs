pub mod bracket;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod io;
pub mod merge;
pub mod optimal;
pub mod outcomes;
pub mod probability;
pub mod projection;
pub mod report;
pub mod scoring;
pub mod simulate;
