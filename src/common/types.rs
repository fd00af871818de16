use failure::Error;

/// Result type returned by operator construction and runs.
pub type HResult<T> = Result<T, Error>;
pub type HError = Error;
