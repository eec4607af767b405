pub mod completion;
pub mod connection;
pub mod endpoints;

pub use completion::{FakeCompletion, OpenRouterCompletion, TextCompletion};
pub use connection::ApiConnectionError;
