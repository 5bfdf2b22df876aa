//! Resolve command line options (or interactive answers) into a validated job request

pub mod job;
pub mod prompt;
pub mod resolve;
