pub mod answer;
pub mod config;
pub mod dataset;
pub mod parse;
pub mod pattern;
