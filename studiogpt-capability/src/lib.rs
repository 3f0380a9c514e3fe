pub mod error;
pub mod http;
pub mod json;
pub mod retry;
pub mod sse;

// Re-export key types for convenience.
pub use error::{CapabilityError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use json::{deserialize, serialize};
pub use retry::{ErrorClass, RetryPolicy};
pub use sse::{SseEvent, parse_sse_stream};
