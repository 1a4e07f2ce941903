//! Shared plumbing for the Xenium faucet workspace: logging bootstrap,
//! layered configuration loading and display formatting.

pub mod utils;
