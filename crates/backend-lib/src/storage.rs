// ============================
// ticketing-backend-lib/src/storage.rs
// ============================
//! Identity storage: the user directory.
//!
//! Both implementations enforce username and email uniqueness inside a single
//! critical section, so a losing concurrent insert fails with a duplicate
//! error even when the caller's own pre-check passed.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

const USERS_FILE: &str = "users.json";

/// Storage failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("verification token does not match")]
    InvalidVerificationToken,

    #[error("identity not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt user store: {0}")]
    Corrupt(String),
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity without credential material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
}

impl Identity {
    /// Password-free projection
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Fields of a freshly registered, unverified identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: String,
}

/// Trait for identity storage backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an unverified identity. Fails if the username or the email is
    /// taken; username is checked first.
    async fn create_unverified(&self, new: NewIdentity) -> Result<Identity, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_verification_token(&self, token: &str)
        -> Result<Option<Identity>, StoreError>;

    /// Flip `is_verified` and clear the token, provided `token` is still the
    /// one stored on the identity. A consumed token always fails.
    async fn mark_verified(&self, id: Uuid, token: &str) -> Result<Identity, StoreError>;

    /// Delete an identity
    async fn remove(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Records plus unique indexes
#[derive(Debug, Clone, Default)]
struct Indexes {
    users: HashMap<Uuid, Identity>,
    by_username: HashMap<String, Uuid>,
    by_email: HashMap<String, Uuid>,
    by_token: HashMap<String, Uuid>,
}

impl Indexes {
    fn from_records(records: Vec<Identity>) -> Result<Self, StoreError> {
        let mut indexes = Self::default();
        for identity in records {
            indexes.insert(identity).map_err(|e| {
                StoreError::Corrupt(format!("duplicate record in {USERS_FILE}: {e}"))
            })?;
        }
        Ok(indexes)
    }

    fn insert(&mut self, identity: Identity) -> Result<Identity, StoreError> {
        if self.by_username.contains_key(&identity.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if self.by_email.contains_key(&identity.email) {
            return Err(StoreError::DuplicateEmail);
        }

        self.by_username.insert(identity.username.clone(), identity.id);
        self.by_email.insert(identity.email.clone(), identity.id);
        if let Some(token) = &identity.verification_token {
            self.by_token.insert(token.clone(), identity.id);
        }
        self.users.insert(identity.id, identity.clone());
        Ok(identity)
    }

    fn create(&mut self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.insert(Identity {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_verified: false,
            verification_token: Some(new.verification_token),
            created_at: Utc::now(),
        })
    }

    fn lookup(&self, index: &HashMap<String, Uuid>, key: &str) -> Option<Identity> {
        index.get(key).and_then(|id| self.users.get(id)).cloned()
    }

    fn mark_verified(&mut self, id: Uuid, token: &str) -> Result<Identity, StoreError> {
        let identity = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if identity.verification_token.as_deref() != Some(token) {
            return Err(StoreError::InvalidVerificationToken);
        }

        identity.is_verified = true;
        identity.verification_token = None;
        self.by_token.remove(token);
        Ok(identity.clone())
    }

    fn remove(&mut self, id: Uuid) -> Result<(), StoreError> {
        let identity = self.users.remove(&id).ok_or(StoreError::NotFound)?;
        self.by_username.remove(&identity.username);
        self.by_email.remove(&identity.email);
        if let Some(token) = &identity.verification_token {
            self.by_token.remove(token);
        }
        Ok(())
    }

    fn records(&self) -> Vec<Identity> {
        let mut records: Vec<Identity> = self.users.values().cloned().collect();
        records.sort_by_key(|i| i.created_at);
        records
    }
}

/// In-memory implementation of the `UserStore` trait
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<Indexes>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_unverified(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.inner.write().create(new)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.lookup(&inner.by_username, username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.lookup(&inner.by_email, email))
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.lookup(&inner.by_token, token))
    }

    async fn mark_verified(&self, id: Uuid, token: &str) -> Result<Identity, StoreError> {
        self.inner.write().mark_verified(id, token)
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.write().remove(id)
    }
}

/// Flat-file implementation of the `UserStore` trait.
///
/// The whole directory lives in memory and is written through to
/// `<root>/users.json` on every change. A failed write leaves both the file
/// and the in-memory directory unchanged.
#[derive(Clone)]
pub struct FlatFileUserStore {
    root: PathBuf,
    indexes: Arc<RwLock<Indexes>>,
    write_lock: Arc<Mutex<()>>,
}

impl FlatFileUserStore {
    /// Open (or create) the store under `root`
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await?;

        let path = root.join(USERS_FILE);
        let records = if tokio_fs::try_exists(&path).await? {
            let content = tokio_fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        let indexes = Indexes::from_records(records)?;
        tracing::info!(users = indexes.users.len(), path = %path.display(), "user store loaded");

        Ok(Self {
            root,
            indexes: Arc::new(RwLock::new(indexes)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    async fn persist(&self, records: &[Identity]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.root.join(format!("{USERS_FILE}.tmp"));

        let mut file = tokio_fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio_fs::rename(&tmp, self.path()).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the directory, write it through, and only
    /// then publish it. Readers never see a change whose write failed.
    /// Writers are serialized by `write_lock`.
    async fn mutate<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Indexes) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut next = self.indexes.read().clone();
        let result = change(&mut next)?;

        if let Err(err) = self.persist(&next.records()).await {
            tracing::error!(error = %err, "failed to persist user store, change discarded");
            return Err(err);
        }

        *self.indexes.write() = next;
        Ok(result)
    }
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn create_unverified(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.mutate(move |indexes| indexes.create(new)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.indexes.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let indexes = self.indexes.read();
        Ok(indexes.lookup(&indexes.by_username, username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let indexes = self.indexes.read();
        Ok(indexes.lookup(&indexes.by_email, email))
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let indexes = self.indexes.read();
        Ok(indexes.lookup(&indexes.by_token, token))
    }

    async fn mark_verified(&self, id: Uuid, token: &str) -> Result<Identity, StoreError> {
        let token = token.to_string();
        self.mutate(move |indexes| indexes.mark_verified(id, &token))
            .await
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.mutate(move |indexes| indexes.remove(id)).await
    }
}
