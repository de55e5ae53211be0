use thiserror::Error;

/// Error type returned by fallible operations across the crate.
///
/// Operations on an `Undefined` `Duration`, `Instant`, or `Transform` do not
/// raise this error -- undefined-ness propagates through the value itself,
/// the same way `NaN` propagates through floating point arithmetic. This
/// error type is reserved for conditions that cannot be represented by
/// simply returning an undefined value: malformed input, data outside a
/// provider's coverage, registry misuse, and arithmetic that would silently
/// wrap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstrodyneError {
    /// A value outside its accepted domain was supplied (negative Julian
    /// date, out-of-range calendar field, composition of transforms tagged
    /// with different instants).
    #[error("domain error: {0}")]
    DomainError(String),

    /// A query fell outside the coverage of a data provider and the
    /// provider's policy forbids extrapolating to fill the gap.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The requested operation is not available in this configuration.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A `Duration` or `Instant` computation would overflow its backing
    /// integer representation.
    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// A frame, or other named registry entry, was registered under a name
    /// already in use.
    #[error("registry conflict: {0}")]
    RegistryConflict(String),

    /// A parent-chain traversal detected a cycle in the frame graph.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// A string could not be parsed into the requested type.
    #[error("parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, AstrodyneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_message() {
        let e = AstrodyneError::OutOfRange("mjd 61000 beyond table".to_string());
        assert_eq!(format!("{}", e), "value out of range: mjd 61000 beyond table");
    }
}
