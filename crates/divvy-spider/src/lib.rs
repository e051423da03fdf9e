pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod service;
pub mod store;
pub mod ticker;
pub mod tiprank;

mod tui;

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use reqwest::Client as HttpClient;
}
