// error.rs - error taxonomy for the RADIUS protocol core
//
// A single enum carries every named error kind a caller of this crate needs to
// distinguish. Encode-time variants (AttributeTooLong, InvalidValue, UnknownAttribute)
// are programmer errors and surface synchronously to the builder. Decode-time variants
// (MalformedPacket, MalformedAttribute, AuthenticatorMismatch, IdentifierMismatch) are
// returned to the client caller, or logged and discarded by the server loop.

use std::net::IpAddr;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RadiusError>;

#[derive(Debug, Error)]
pub enum RadiusError {
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("malformed attribute (type {attr_type}): {reason}")]
    MalformedAttribute { attr_type: u8, reason: String },

    #[error("response authenticator mismatch for identifier {identifier}")]
    AuthenticatorMismatch { identifier: u8 },

    #[error("identifier mismatch: request had {expected}, response had {actual}")]
    IdentifierMismatch { expected: u8, actual: u8 },

    #[error("attribute '{name}' value too long: {len} bytes (max 253)")]
    AttributeTooLong { name: String, len: usize },

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("invalid value for attribute '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("communication failure after {attempts} attempt(s) to {target}")]
    CommunicationFailure { attempts: u32, target: String },

    #[error("no authentication path configured (neither external authenticator nor credential store enabled)")]
    UnconfiguredAuthPath,

    #[error("no shared secret configured for NAS {0}")]
    UnknownNas(IpAddr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
