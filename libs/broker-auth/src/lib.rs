//! OIDC token minting and JWKS-backed bearer token verification for the
//! broker data plane.

#[cfg(feature = "axum-ext")]
pub mod axum_ext;
pub mod claims;
pub mod errors;
pub mod jwks;
pub mod minter;

#[cfg(feature = "axum-ext")]
pub use axum_ext::AuthClaims;
pub use claims::Claims;
pub use errors::AuthError;
pub use jwks::JwksValidator;
pub use minter::{IdTokenMinter, MintedToken, TokenSource};
