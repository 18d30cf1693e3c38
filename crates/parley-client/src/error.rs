/// Errors that can occur in the platform client layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The platform SDK couldn't be loaded, or it doesn't offer a way to
    /// construct connections.
    #[error("messaging SDK unavailable: {0}")]
    SdkUnavailable(String),

    /// The platform rejected the credential (expired, revoked, malformed).
    #[error("credential rejected by platform: {0}")]
    Auth(String),

    /// A request to the platform failed in transit.
    #[error("platform request failed: {0}")]
    Request(String),

    /// The platform answered with something the client couldn't interpret.
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),

    /// The connection was already shut down.
    #[error("connection closed")]
    Closed,
}
