pub mod env;

pub use env::{EnvLookup, EnvUtils, EnvVarError, ProcessEnv};
