//! CLI argument model and validation for the Slack-to-Cursor relay binary.
//!
//! Every option is available both as a long flag and as the environment
//! variable the relay has always read, so `.env`-style deployments keep
//! working unchanged.

pub mod cli_args;
pub mod validation;

pub use cli_args::Cli;
pub use validation::*;
