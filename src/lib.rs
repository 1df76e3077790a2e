//! Codeforces statement pipeline: scrape problem pages, normalize the
//! statement markup to canonical text and extract a fixed feature record.

pub mod db;
pub mod features;
pub mod fetch;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod problem;
pub mod settings;
