//! Backend API client.

mod client;
mod http;
mod types;

pub use client::ApiClient;
pub use http::{HttpClient, Timeouts};
pub use types::{ChatInfo, ScrapeReport, ScrapeStatus};
