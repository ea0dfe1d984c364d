//! Request transport errors

mod error_code;
mod http_error;

pub use error_code::ErrorCode;
pub use http_error::{ApiError, HttpError, HttpResult};
