//! RADIUS (RFC 2865 / RFC 2866) protocol core: wire codec, attribute dictionary,
//! authenticator engine, and UDP client/server loops.

pub mod attribute;
pub mod auth;
pub mod authenticator;
pub mod client;
pub mod codec;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod identifier;
pub mod octets;
pub mod packet;
pub mod server;

pub use error::{RadiusError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
