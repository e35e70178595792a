//! Who is acting, and whether they may touch a scope

use lane_sync::Scope;

use super::{DomainError, DomainResult};

/// An identified session user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub tenant: u64,
}

impl Actor {
    pub fn new(id: impl Into<String>, tenant: u64) -> Self {
        Self {
            id: id.into(),
            tenant,
        }
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: &Actor, scope: Scope) -> DomainResult<()>;
}

/// Allows an actor inside its own tenant only
#[derive(Debug, Default, Clone, Copy)]
pub struct TenantAuthorizer;

impl Authorizer for TenantAuthorizer {
    fn authorize(&self, actor: &Actor, scope: Scope) -> DomainResult<()> {
        if actor.tenant == scope.tenant() {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "{} may not act in {}",
                actor.id, scope
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_authorizer() {
        let actor = Actor::new("ana", 1);
        let auth = TenantAuthorizer;
        assert!(auth.authorize(&actor, Scope::Tenant { tenant: 1 }).is_ok());
        assert!(auth
            .authorize(&actor, Scope::Board { tenant: 1, board: 9 })
            .is_ok());
        assert!(matches!(
            auth.authorize(&actor, Scope::Department { tenant: 2, department: 1 }),
            Err(DomainError::Unauthorized(_))
        ));
    }
}
