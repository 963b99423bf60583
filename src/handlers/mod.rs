// Handler modules
pub mod analyze;
pub mod auth;
pub mod filters;
pub mod progress;

pub use analyze::{AnalyzeOptions, handle_analyze};
pub use auth::handle_auth;
pub use filters::handle_filters;
pub use progress::BarProgress;
