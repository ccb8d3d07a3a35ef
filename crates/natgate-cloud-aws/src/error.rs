//! EC2 error mapping
//!
//! Turns SDK errors into `RemoteError`s carrying the EC2 error code, and
//! decides which of them are worth retrying from a polling loop.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use natgate_cloud::{CloudError, RemoteError};

/// EC2 error codes that indicate a temporary condition
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "InternalError",
    "InternalFailure",
    "ServiceUnavailable",
    "Unavailable",
    "RequestTimeout",
];

pub fn is_transient_code(code: &str) -> bool {
    TRANSIENT_CODES.contains(&code)
}

/// Map an SDK error from `operation` into a `CloudError::Remote`
pub fn from_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{} failed: {}", operation, DisplayErrorContext(&err));

    let remote = match &err {
        SdkError::TimeoutError(_) => RemoteError::transient("TimeoutError", message),
        SdkError::DispatchFailure(_) => RemoteError::transient("DispatchFailure", message),
        SdkError::ResponseError(_) => RemoteError::transient("ResponseError", message),
        SdkError::ServiceError(_) => {
            let code = err
                .as_service_error()
                .and_then(ProvideErrorMetadata::code)
                .unwrap_or("Unknown")
                .to_string();
            if is_transient_code(&code) {
                RemoteError::transient(code, message)
            } else {
                RemoteError::new(code, message)
            }
        }
        _ => RemoteError::new("ConstructionFailure", message),
    };

    tracing::debug!("{}", remote);
    CloudError::Remote(remote)
}
