//! Errors raised while reading TAP streams.
//!
//! Parsing itself never fails: lines the parser does not recognise become
//! [`crate::TapEvent::Extra`].

#[derive(Debug, thiserror::Error)]
pub enum TapError {
    #[error("failed to read TAP input: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write report: {0}")]
    Write(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TapError>;
