//! Small shared utilities used across the broker data plane crates.

pub mod env;
pub mod secret_string;

pub use env::EnvError;
pub use secret_string::SecretString;
