mod error;
mod provider;
mod request;
mod stream;
mod types;

pub use provider::{DEFAULT_URL, YandexGptConfig, YandexGptProvider};
