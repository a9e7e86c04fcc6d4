use std::sync::Arc;

use lesson_core::model::{FamilyId, Profile, default_family_name};
use storage::repository::FamilyRepository;
use tracing::info;

use crate::auth::AuthSession;
use crate::error::FamilyError;

/// Who is signed in and which family they act for. Built once per sign-in
/// by the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyContext {
    pub session: AuthSession,
    pub profile: Profile,
    pub family_id: FamilyId,
}

#[derive(Clone)]
pub struct FamilyService {
    families: Arc<dyn FamilyRepository>,
}

impl FamilyService {
    #[must_use]
    pub fn new(families: Arc<dyn FamilyRepository>) -> Self {
        Self { families }
    }

    /// Resolves (or creates) the family of a fresh session in one call.
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::Storage` if the resolve procedure fails.
    pub async fn resolve(&self, session: AuthSession) -> Result<FamilyContext, FamilyError> {
        let email = session.email.as_deref();
        let resolution = self
            .families
            .resolve_family(&session.user_id, email, &default_family_name(email))
            .await?;
        info!(user_id = %session.user_id, family_id = %resolution.family_id, "family resolved");

        Ok(FamilyContext {
            session,
            profile: resolution.profile,
            family_id: resolution.family_id,
        })
    }
}
