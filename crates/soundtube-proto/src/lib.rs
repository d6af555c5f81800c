//! Shared types for the soundtube client: wire records and their normalized
//! forms, configuration, platform paths and durable session storage.

pub mod config;
pub mod platform;
pub mod protocol;
pub mod storage;
