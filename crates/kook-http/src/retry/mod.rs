//! Bounded exponential-backoff retry

mod executor;
mod policy;

pub use executor::RetryExecutor;
pub use policy::RetryPolicy;
