use crate::db::User;
use crate::jwt::AccessClaims;

/// The caller resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Fresh lookup of the user named by `claims.sub`
    pub user: User,
    /// JWT claims from the access token
    pub claims: AccessClaims,
}
