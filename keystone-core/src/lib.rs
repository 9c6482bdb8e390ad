//! Core functionality for keystone
//!
//! This crate contains the building blocks of the keystone authentication core:
//!
//! - [`identity`] maps raw OAuth provider payloads onto a canonical [`Identity`]
//! - [`token`] signs and verifies access and refresh tokens
//! - [`rbac`] resolves roles to permissions and tracks role assignments
//! - [`storage`] holds live sessions and enforces the per-user session cap
//! - [`gate`] authenticates requests and checks role/permission requirements
//!
//! The session lifecycle (login, refresh, logout) that ties these together
//! lives in the `keystone` crate. Application code should normally depend on
//! that crate instead of this one.
//!
//! Everything here is synchronous and performs no I/O apart from the
//! [`IdentityProvider`] contract, which is implemented outside this crate.
pub mod crypto;
pub mod error;
pub mod gate;
pub mod id;
pub mod identity;
pub mod rbac;
pub mod session;
pub mod storage;
pub mod token;
pub mod user;
pub mod validation;

pub use error::Error;
pub use gate::{AuthContext, AuthorizationGate, bearer_token};
pub use identity::{Identity, IdentityProvider, Provider, normalize};
pub use rbac::{Permission, PermissionSet, RbacResolver, Role, RoleCatalog};
pub use session::{ClientMetadata, Session, SessionId};
pub use storage::SessionStore;
pub use token::{Claims, SignedToken, TokenCodec, TokenConfig, TokenKind};
pub use user::UserId;
