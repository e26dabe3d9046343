//! Issuetrack - command-line surface over `issuetrack-core`
//!
//! Every command prints its result as JSON on stdout; failures go to stderr
//! as a JSON error object and set the exit code.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod cli;
pub mod output;
