pub mod errors;

pub use errors::{ErrorContext, SampleError, SampleResult};
