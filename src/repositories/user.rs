//! UserRepository - Users persistence

use super::{Create, Delete, IN_LIST_CHUNK, Read, Update};
use crate::dtos::{CreateUserDTO, UpdateUserDTO};
use crate::entities::User;
use chrono::{DateTime, Utc};
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};

const USER_COLUMNS: &str = "id, name, email, password, profile_image_url, role, \
    reset_password_token, reset_password_expire, is_verified, last_login, created_at, updated_at";

pub struct UserRepository {
    connection_pool: SqlitePool,
}

impl UserRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Emails are unique, so at most one user matches
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Find the user holding `hashed_token` whose reset window is still open at `now`
    #[instrument(skip(self, hashed_token))]
    pub async fn find_by_reset_token(
        &self,
        hashed_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_password_token = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(hashed_token)
            .fetch_optional(&self.connection_pool)
            .await?;

        Ok(user.filter(|u| u.reset_password_expire.is_some_and(|exp| exp > now)))
    }

    /// All users with the member role, ordered by name
    #[instrument(skip(self))]
    pub async fn find_members(&self) -> Result<Vec<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'member' ORDER BY name, id");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name, id");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Every user except `user_id`, ordered by name
    #[instrument(skip(self))]
    pub async fn find_all_except(&self, user_id: i64) -> Result<Vec<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id <> ? ORDER BY name, id");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut users = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut query_builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ("));
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            query_builder.push(")");

            users.extend(
                query_builder
                    .build_query_as::<User>()
                    .fetch_all(&self.connection_pool)
                    .await?,
            );
        }
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    /// True when every id in `ids` belongs to an existing user
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn all_exist(&self, ids: &[i64]) -> Result<bool, Error> {
        let mut unique: Vec<i64> = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let found = self.find_many(&unique).await?;
        debug!("{} of {} users found", found.len(), unique.len());
        Ok(found.len() == unique.len())
    }

    #[instrument(skip(self))]
    pub async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query("UPDATE users SET last_login = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    /// Store (or clear, with None) the hashed reset token and its expiry
    #[instrument(skip(self, hashed_token))]
    pub async fn set_reset_token(
        &self,
        id: i64,
        hashed_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE users SET reset_password_token = ?, reset_password_expire = ?, updated_at = ? WHERE id = ?",
        )
        .bind(hashed_token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and drop any pending reset token
    #[instrument(skip(self, password_hash))]
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), Error> {
        sqlx::query(
            "UPDATE users SET password = ?, reset_password_token = NULL, reset_password_expire = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        info!("Password updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_verified(&self, id: i64) -> Result<User, Error> {
        sqlx::query("UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        self.read(&id).await?.ok_or(Error::RowNotFound)
    }
}

impl Create<User, CreateUserDTO> for UserRepository {
    #[instrument(skip(self, data), fields(email = %data.email))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        debug!("Creating user");
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password, profile_image_url, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password)
        .bind(&data.profile_image_url)
        .bind(data.role)
        .bind(now)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_rowid();
        info!("User created with id {}", new_id);

        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<User, i64> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<User, UpdateUserDTO, i64> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateUserDTO) -> Result<User, Error> {
        let current_user = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.is_empty() {
            debug!("No fields to update, returning current user");
            return Ok(current_user);
        }

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref email) = data.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email);
        }
        if let Some(ref url) = data.profile_image_url {
            separated.push("profile_image_url = ");
            separated.push_bind_unseparated(url);
        }
        if let Some(ref password) = data.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password);
        }
        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(*id);
        query_builder.build().execute(&self.connection_pool).await?;

        info!("User updated");
        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

impl Delete<i64> for UserRepository {
    /// Hard delete. Assignments and memberships cascade, authored tasks keep a null creator.
    #[instrument(skip(self), fields(user_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_find_by_email(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);

        let alice = repo.find_by_email("alice@orbit.test").await?.expect("alice");
        assert_eq!(alice.id, 1);
        assert_eq!(alice.role, UserRole::Admin);
        assert!(alice.verify_password("Password123"));

        assert!(repo.find_by_email("nobody@orbit.test").await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_find_members_excludes_admins(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let members = repo.find_members().await?;
        assert_eq!(members.len(), 3);
        assert!(members.iter().all(|m| m.role == UserRole::Member));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_all_exist_ignores_duplicates(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        assert!(repo.all_exist(&[2, 3, 2]).await?);
        assert!(!repo.all_exist(&[2, 99]).await?);
        assert!(repo.all_exist(&[]).await?);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_reset_token_expires(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let now = Utc::now();
        repo.set_reset_token(2, Some("hashed"), Some(now + chrono::Duration::minutes(10)))
            .await?;

        assert!(repo.find_by_reset_token("hashed", now).await?.is_some());
        assert!(
            repo.find_by_reset_token("hashed", now + chrono::Duration::minutes(11))
                .await?
                .is_none()
        );

        repo.set_password(2, "new-hash").await?;
        assert!(repo.find_by_reset_token("hashed", now).await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_partial_update_keeps_other_fields(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let updated = repo
            .update(
                &2,
                &UpdateUserDTO {
                    name: Some("Robert".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(updated.name, "Robert");
        assert_eq!(updated.email, "bob@orbit.test");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_delete_missing_user_is_not_found(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        assert!(matches!(repo.delete(&99).await, Err(Error::RowNotFound)));
        repo.delete(&4).await?;
        assert!(repo.read(&4).await?.is_none());
        Ok(())
    }
}
