pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod rate_limiter;
pub mod sentiment;
pub mod server;
pub mod validation;

pub use config::Config;
pub use error::ApiError;
pub use handlers::{AppState, SharedState};
pub use sentiment::{Sentiment, SentimentModel};
pub use server::create_app;
