//! Authenticated access to the portal API.

mod navigator;
mod options;
mod pipeline;
pub mod refresh;

pub use navigator::{LoggingNavigator, Navigator, RecordingNavigator};
pub use options::RequestOptions;
pub use pipeline::AuthClient;
pub use refresh::RefreshCoordinator;
