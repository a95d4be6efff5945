//! Authority gate: the one principal that unlocks administration.
//!
//! The authority is written exactly once, by the principal itself. After
//! that, administrative setters pass the gate. Under the default
//! [`AdminPolicy::AnyCaller`] the gate only checks that an authority
//! *exists*, not that the caller *is* the authority; calls by anyone else
//! are logged so the gap stays visible.

use std::sync::OnceLock;

use remitflow_types::{AdminPolicy, CallContext, Principal, RemitError, Result};

/// Set-once holder of the authority principal.
#[derive(Debug, Default)]
pub struct AuthorityGate {
    authority: OnceLock<Principal>,
    policy: AdminPolicy,
}

impl AuthorityGate {
    #[must_use]
    pub fn new(policy: AdminPolicy) -> Self {
        Self {
            authority: OnceLock::new(),
            policy,
        }
    }

    /// Appoint `principal` as the authority.
    ///
    /// # Errors
    /// - `AuthorityAlreadySet` if an authority exists (checked first)
    /// - `NotSelf` unless the caller is `principal`
    pub fn set_authority(&self, ctx: &CallContext, principal: &Principal) -> Result<()> {
        if self.authority.get().is_some() {
            return Err(RemitError::AuthorityAlreadySet);
        }
        if &ctx.caller != principal {
            return Err(RemitError::NotSelf);
        }
        // A concurrent winner between the check and the write still loses here.
        self.authority
            .set(principal.clone())
            .map_err(|_| RemitError::AuthorityAlreadySet)?;

        tracing::info!(authority = %principal, height = ctx.block_height, "Authority set");
        Ok(())
    }

    #[must_use]
    pub fn authority(&self) -> Option<&Principal> {
        self.authority.get()
    }

    /// Gate an administrative call.
    ///
    /// # Errors
    /// - `AuthorityNotSet` if no authority exists
    /// - `NotAuthorized` under [`AdminPolicy::AuthorityOnly`] when the caller is not the authority
    pub fn require_admin(&self, ctx: &CallContext) -> Result<&Principal> {
        let authority = self.authority.get().ok_or(RemitError::AuthorityNotSet)?;
        if &ctx.caller != authority {
            match self.policy {
                AdminPolicy::AuthorityOnly => return Err(RemitError::NotAuthorized),
                AdminPolicy::AnyCaller => tracing::warn!(
                    caller = %ctx.caller,
                    authority = %authority,
                    "Administrative change by a non-authority caller"
                ),
            }
        }
        Ok(authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(caller: &str) -> CallContext {
        CallContext::new(caller, 1)
    }

    #[test]
    fn set_once_by_self() {
        let gate = AuthorityGate::default();
        let admin = Principal::new("admin");
        gate.set_authority(&ctx("admin"), &admin).unwrap();
        assert_eq!(gate.authority(), Some(&admin));
    }

    #[test]
    fn not_self_rejected() {
        let gate = AuthorityGate::default();
        let err = gate
            .set_authority(&ctx("mallory"), &Principal::new("admin"))
            .unwrap_err();
        assert!(matches!(err, RemitError::NotSelf));
        assert!(gate.authority().is_none());
    }

    #[test]
    fn second_set_rejected() {
        let gate = AuthorityGate::default();
        gate.set_authority(&ctx("admin"), &Principal::new("admin"))
            .unwrap();
        let err = gate
            .set_authority(&ctx("other"), &Principal::new("other"))
            .unwrap_err();
        assert!(matches!(err, RemitError::AuthorityAlreadySet));
        assert_eq!(gate.authority(), Some(&Principal::new("admin")));
    }

    #[test]
    fn admin_requires_authority() {
        let gate = AuthorityGate::default();
        assert!(matches!(
            gate.require_admin(&ctx("admin")),
            Err(RemitError::AuthorityNotSet)
        ));
    }

    #[test]
    fn any_caller_passes_once_authority_exists() {
        let gate = AuthorityGate::default();
        gate.set_authority(&ctx("admin"), &Principal::new("admin"))
            .unwrap();
        // Documents the open administrative surface of the default policy.
        assert!(gate.require_admin(&ctx("stranger")).is_ok());
    }

    #[test]
    fn authority_only_policy_rejects_others() {
        let gate = AuthorityGate::new(AdminPolicy::AuthorityOnly);
        gate.set_authority(&ctx("admin"), &Principal::new("admin"))
            .unwrap();
        assert!(matches!(
            gate.require_admin(&ctx("stranger")),
            Err(RemitError::NotAuthorized)
        ));
        assert!(gate.require_admin(&ctx("admin")).is_ok());
    }
}
