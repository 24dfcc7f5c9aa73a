//! Front-ends that drive a screener flow.

pub mod cli;

pub use cli::CliChannel;
