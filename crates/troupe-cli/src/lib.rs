//! Troupe CLI library: command implementations and the workflow file
//! format, shared by the `troupe` binary and its integration tests.

pub mod commands;
pub mod workflow_file;
