//! Authorization boundary.
//!
//! Authentication against real identity providers lives outside this crate;
//! the gateway only needs the resolved identity for trace and log
//! correlation. The [`Authorizer`] trait is the seam the transport layer
//! plugs its provider into; [`StaticAuthorizer`] serves local and test use.

use anyhow::Result;

pub const DEFAULT_USER_ID: &str = "local";
pub const DEFAULT_COMPANY_ID: &str = "local";

/// Who is running a workflow. Used purely for span/log correlation.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub company_id: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            company_id: DEFAULT_COMPANY_ID.to_string(),
        }
    }
}

/// Resolve an opaque credential into an identity, or `None` when the caller
/// is not authorized.
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, access_token: &str) -> Result<Option<Identity>>;
}

/// Always authorizes with a fixed identity.
pub struct StaticAuthorizer {
    identity: Identity,
}

impl StaticAuthorizer {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait::async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, _access_token: &str) -> Result<Option<Identity>> {
        Ok(Some(self.identity.clone()))
    }
}
