pub mod constants;
pub mod progress;
pub mod request_id;
pub mod sanitize;

pub use constants::*;
pub use progress::ProgressReporter;
pub use request_id::new_request_id;
