#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod stream;

pub use api::ApiClient;
pub use error::{Error, Result};
pub use stream::TextStream;
