pub mod config;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod time;

pub use config::Config;
pub use error::*;
pub use fingerprint::{cyrb53, fingerprint};
pub use model::*;
