pub mod error;
pub mod outcome;
pub mod request;

pub use error::ApiError;
pub use outcome::{Envelope, ResponseOutcome};
pub use request::{Encoding, MultipartField, RequestBody, RequestDescriptor};
