//! Storage-backed user repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::avatar::ContentHash;
use crate::domain::storage::Storage;
use crate::domain::user::{ProfilePatch, UserId, UserRecord, UserRepository};
use crate::domain::DomainError;

/// UserRepository implementation over a generic keyed storage
///
/// The storage only offers whole-entity writes, so every read-modify-write
/// runs under `writes` to keep field-level updates atomic per record.
#[derive(Debug)]
pub struct StorageUserRepository {
    storage: Arc<dyn Storage<UserRecord>>,
    writes: Mutex<()>,
}

impl StorageUserRepository {
    pub fn new(storage: Arc<dyn Storage<UserRecord>>) -> Self {
        Self {
            storage,
            writes: Mutex::new(()),
        }
    }
}

#[async_trait]
impl UserRepository for StorageUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DomainError> {
        self.storage.get(id).await
    }

    async fn create(&self, user: UserRecord) -> Result<UserRecord, DomainError> {
        let _writes = self.writes.lock().await;

        if self.storage.exists(user.id()).await? {
            return Err(DomainError::conflict(format!(
                "User '{}' already exists",
                user.id()
            )));
        }

        self.storage.create(user).await
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        let _writes = self.writes.lock().await;
        self.storage.delete(id).await
    }

    async fn update_profile(
        &self,
        id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserRecord>, DomainError> {
        let _writes = self.writes.lock().await;

        let Some(mut record) = self.storage.get(id).await? else {
            return Ok(None);
        };

        record.apply_patch(patch.clone());
        self.storage.save(record).await.map(Some)
    }

    async fn associate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<Option<ContentHash>, DomainError> {
        let _writes = self.writes.lock().await;

        let mut record = self
            .storage
            .get(id)
            .await?
            .unwrap_or_else(|| UserRecord::avatar_only(id.clone()));
        let previous = record.avatar_hash().cloned();

        record.set_avatar_hash(hash.clone());
        self.storage.save(record).await?;

        Ok(previous)
    }

    async fn dissociate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<bool, DomainError> {
        let _writes = self.writes.lock().await;

        let Some(mut record) = self.storage.get(id).await? else {
            return Ok(false);
        };

        if record.avatar_hash() != Some(hash) {
            return Ok(false);
        }

        if record.is_avatar_only() {
            self.storage.delete(id).await?;
        } else {
            record.clear_avatar_hash();
            self.storage.save(record).await?;
        }

        Ok(true)
    }

    async fn count_by_avatar_hash(&self, hash: &ContentHash) -> Result<usize, DomainError> {
        let users = self.storage.list().await?;

        Ok(users
            .iter()
            .filter(|user| user.avatar_hash() == Some(hash))
            .count())
    }

    async fn exists(&self, id: &UserId) -> Result<bool, DomainError> {
        self.storage.exists(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::NewUserProfile;
    use crate::infrastructure::storage::InMemoryStorage;

    fn create_repo() -> StorageUserRepository {
        StorageUserRepository::new(Arc::new(InMemoryStorage::<UserRecord>::new()))
    }

    fn create_user(id: &str) -> UserRecord {
        UserRecord::new(
            UserId::new(id).unwrap(),
            NewUserProfile {
                first_name: "Ada".to_string(),
                last_name: None,
                email: "ada@example.com".to_string(),
            },
        )
    }

    fn hash(value: &str) -> ContentHash {
        ContentHash::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = create_repo();
        let user = create_user("1");

        repo.create(user.clone()).await.unwrap();

        let retrieved = repo.get(user.id()).await.unwrap();
        assert_eq!(retrieved, Some(user));
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let repo = create_repo();

        repo.create(create_user("1")).await.unwrap();
        let result = repo.create(create_user("1")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_count_by_avatar_hash() {
        let repo = create_repo();

        for (id, digest) in [("1", "aa"), ("2", "aa"), ("3", "bb")] {
            let mut user = create_user(id);
            user.set_avatar_hash(hash(digest));
            repo.create(user).await.unwrap();
        }
        repo.create(create_user("4")).await.unwrap();

        assert_eq!(repo.count_by_avatar_hash(&hash("aa")).await.unwrap(), 2);
        assert_eq!(repo.count_by_avatar_hash(&hash("bb")).await.unwrap(), 1);
        assert_eq!(repo.count_by_avatar_hash(&hash("cc")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = create_repo();
        let user = create_user("1");
        repo.create(user.clone()).await.unwrap();

        assert!(repo.delete(user.id()).await.unwrap());
        assert!(repo.get(user.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_avatar_hash() {
        let repo = create_repo();
        let mut user = create_user("1");
        user.set_avatar_hash(hash("aa"));
        repo.create(user).await.unwrap();

        let patch = ProfilePatch {
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        };
        let updated = repo.update_profile(&UserId::new("1").unwrap(), &patch).await.unwrap();

        let updated = updated.unwrap();
        assert_eq!(updated.last_name(), Some("Lovelace"));
        assert_eq!(updated.avatar_hash(), Some(&hash("aa")));
    }

    #[tokio::test]
    async fn test_update_profile_missing_record() {
        let repo = create_repo();

        let result = repo
            .update_profile(&UserId::new("1").unwrap(), &ProfilePatch::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_associate_avatar_creates_avatar_only_record() {
        let repo = create_repo();
        let id = UserId::new("7").unwrap();

        assert_eq!(repo.associate_avatar(&id, &hash("aa")).await.unwrap(), None);
        assert_eq!(
            repo.associate_avatar(&id, &hash("bb")).await.unwrap(),
            Some(hash("aa"))
        );

        let record = repo.get(&id).await.unwrap().unwrap();
        assert!(record.is_avatar_only());
        assert_eq!(record.avatar_hash(), Some(&hash("bb")));
    }

    #[tokio::test]
    async fn test_dissociate_avatar() {
        let repo = create_repo();
        let profile_id = UserId::new("1").unwrap();
        let avatar_only_id = UserId::new("2").unwrap();

        repo.create(create_user("1")).await.unwrap();
        repo.associate_avatar(&profile_id, &hash("aa")).await.unwrap();
        repo.associate_avatar(&avatar_only_id, &hash("aa")).await.unwrap();

        // Stale hash leaves the record untouched
        assert!(!repo.dissociate_avatar(&profile_id, &hash("bb")).await.unwrap());

        assert!(repo.dissociate_avatar(&profile_id, &hash("aa")).await.unwrap());
        let record = repo.get(&profile_id).await.unwrap().unwrap();
        assert_eq!(record.first_name(), Some("Ada"));
        assert!(record.avatar_hash().is_none());

        assert!(repo.dissociate_avatar(&avatar_only_id, &hash("aa")).await.unwrap());
        assert!(!repo.exists(&avatar_only_id).await.unwrap());
        assert!(!repo.dissociate_avatar(&avatar_only_id, &hash("aa")).await.unwrap());
    }
}
