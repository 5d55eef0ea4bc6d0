use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Malformed query window, or a commit date outside the booking horizon.
    InvalidRange(&'static str),
    /// Upstream data corruption — surfaced, never silently resolved.
    InvariantViolation(&'static str),
    /// The requested slot was taken between listing and commit. Recoverable:
    /// re-list availability and retry.
    SlotUnavailable,
    Validation(&'static str),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::InvalidRange(msg) => write!(f, "invalid range: {msg}"),
            EngineError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            EngineError::SlotUnavailable => write!(f, "slot no longer available"),
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
