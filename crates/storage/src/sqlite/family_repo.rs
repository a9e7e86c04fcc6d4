use async_trait::async_trait;
use lesson_core::model::{FamilyId, FamilyResolution, Profile, ProfileId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{FamilyRepository, PreferenceRepository, StorageError};

#[async_trait]
impl FamilyRepository for SqliteRepository {
    async fn resolve_family(
        &self,
        user_id: &ProfileId,
        email: Option<&str>,
        default_name: &str,
    ) -> Result<FamilyResolution, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO profiles (id, email, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                email = COALESCE(excluded.email, profiles.email)
            ",
        )
        .bind(user_id.as_str())
        .bind(email)
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let stored_email: Option<String> = sqlx::query("SELECT email FROM profiles WHERE id = ?1")
            .bind(user_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?
            .try_get("email")
            .map_err(ser)?;
        let profile = Profile {
            id: user_id.clone(),
            email: stored_email,
        };

        // Existing membership: prefer the family with the most children.
        let member_of = sqlx::query(
            r"
            SELECT fm.family_id,
                   (SELECT COUNT(*) FROM child_profiles c WHERE c.family_id = fm.family_id) AS child_count
            FROM family_members fm
            WHERE fm.profile_id = ?1
            ORDER BY child_count DESC, fm.rowid ASC
            LIMIT 1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        if let Some(row) = member_of {
            let family_id: String = row.try_get("family_id").map_err(ser)?;
            tx.commit().await.map_err(conn)?;
            return Ok(FamilyResolution {
                profile,
                family_id: family_id.into(),
            });
        }

        let owned = sqlx::query(
            r"
            SELECT id FROM families
            WHERE created_by = ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        let family_id = match owned {
            Some(row) => FamilyId::from(row.try_get::<String, _>("id").map_err(ser)?),
            None => {
                let family_id = FamilyId::generate();
                sqlx::query(
                    r"
                    INSERT INTO families (id, name, created_by, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(family_id.as_str())
                .bind(default_name)
                .bind(user_id.as_str())
                .bind(self.clock.now())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
                tracing::debug!(family_id = %family_id, "created family");
                family_id
            }
        };

        sqlx::query(
            r"
            INSERT INTO family_members (family_id, profile_id, role)
            VALUES (?1, ?2, 'admin')
            ON CONFLICT(family_id, profile_id) DO NOTHING
            ",
        )
        .bind(family_id.as_str())
        .bind(user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(FamilyResolution { profile, family_id })
    }
}

#[async_trait]
impl PreferenceRepository for SqliteRepository {
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: i64 = row.try_get("value").map_err(ser)?;
        Ok(Some(value != 0))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO preferences (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(i64::from(value))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
