//! The `hb` binary's command-line front end.
//!
//! Everything this crate does beyond argument parsing, logging setup and
//! writing the manifest to disk lives in `hb-build`; this crate is the
//! thin driver that owns the process: argument parsing, environment
//! setup, and exit codes.

pub mod cli;
