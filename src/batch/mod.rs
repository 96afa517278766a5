//! The two batch runs: fetch-and-render, then acknowledge.

pub mod acknowledge;
pub mod fetch;

pub use acknowledge::{run_acknowledge, AckReport};
pub use fetch::{run_fetch, FetchOptions, FetchReport};
