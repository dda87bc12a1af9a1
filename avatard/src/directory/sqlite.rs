//! SQLite-backed directory

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::{Community, Directory, DirectoryError, User};

/// Directory over the `users` and `communities` tables
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user; emails are stored lowercased
    pub async fn create_user(
        &self,
        email: &str,
        avatar: Option<&str>,
    ) -> Result<User, DirectoryError> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            avatar: avatar.map(str::to_string),
        };

        sqlx::query("INSERT INTO users (id, email, avatar) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.avatar)
            .execute(&self.pool)
            .await?;

        debug!("Created user {} <{}>", user.id, user.email);
        Ok(user)
    }

    /// Create a community
    pub async fn create_community(
        &self,
        title: &str,
        avatar: Option<&str>,
    ) -> Result<Community, DirectoryError> {
        let community = Community {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            avatar: avatar.map(str::to_string),
        };

        sqlx::query("INSERT INTO communities (id, title, avatar) VALUES (?, ?, ?)")
            .bind(&community.id)
            .bind(&community.title)
            .bind(&community.avatar)
            .execute(&self.pool)
            .await?;

        debug!("Created community {} ({})", community.id, community.title);
        Ok(community)
    }

    /// Point a user at a new avatar image
    pub async fn set_user_avatar(&self, user_id: &str, avatar: &str) -> Result<bool, DirectoryError> {
        let result = sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
            .bind(avatar)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, email, avatar FROM users WHERE email = ?")
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, email, avatar)| User { id, email, avatar }))
    }

    async fn load_community(&self, id: &str) -> Result<Option<Community>, DirectoryError> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, title, avatar FROM communities WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, title, avatar)| Community { id, title, avatar }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_pool;

    #[tokio::test]
    async fn test_find_user_by_email_case_insensitive() {
        let directory = SqliteDirectory::new(test_pool().await);
        let created = directory
            .create_user("Alice@Example.com", Some("img1"))
            .await
            .unwrap();

        let found = directory
            .find_user_by_email("ALICE@example.COM")
            .await
            .unwrap()
            .expect("user should exist");
        assert_eq!(found, created);
        assert_eq!(found.avatar.as_deref(), Some("img1"));

        assert!(directory
            .find_user_by_email("bob@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let directory = SqliteDirectory::new(test_pool().await);
        directory.create_user("a@b.c", None).await.unwrap();
        assert!(directory.create_user("A@B.C", None).await.is_err());
    }

    #[tokio::test]
    async fn test_load_community() {
        let directory = SqliteDirectory::new(test_pool().await);
        let created = directory
            .create_community("Rustaceans", Some("img9"))
            .await
            .unwrap();

        let loaded = directory.load_community(&created.id).await.unwrap();
        assert_eq!(loaded, Some(created));
        assert!(directory.load_community("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_user_avatar() {
        let directory = SqliteDirectory::new(test_pool().await);
        let user = directory.create_user("a@b.c", None).await.unwrap();

        assert!(directory.set_user_avatar(&user.id, "img2").await.unwrap());
        let found = directory.find_user_by_email("a@b.c").await.unwrap().unwrap();
        assert_eq!(found.avatar.as_deref(), Some("img2"));
    }
}
