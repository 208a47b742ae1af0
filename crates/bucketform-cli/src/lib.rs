//! Command implementations behind the `bucketform` binary.

pub mod commands;
