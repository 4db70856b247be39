//! Core modules for the replay streaming pipeline.
//!
//! Control flow: [`dataset`] loads a CSV once at startup, [`emitter`] replays
//! it one record per tick, [`normalize`] optionally cleans and scales each
//! record, and [`sink`] publishes it to Kafka or a push stream served by
//! [`server`].

pub mod config;
pub mod dataset;
pub mod emitter;
pub mod normalize;
pub mod serialization;
pub mod server;
pub mod sink;
pub mod types;
