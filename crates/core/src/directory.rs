//! User directory client.
//!
//! Patient demographics are owned by the platform's user service; this
//! module is the lookup-by-id / batch-lookup port plus its HTTP adapter.
//! Missing users are an expected outcome (`None` / omitted from batch
//! results), not an error.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::{CoreError, CoreResult};

/// A user record as served by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whole years since birth, when a birth date is on record.
    pub fn age(&self) -> Option<u32> {
        let birth = self.birth_date?;
        Utc::now().date_naive().years_since(birth)
    }
}

/// Lookup-by-id oracle over the remote user service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the id is unknown to the directory.
    async fn get_by_id(&self, user_id: &str) -> CoreResult<Option<UserRecord>>;
    /// Batch lookup; ids absent from the directory are silently omitted.
    async fn get_by_ids(&self, user_ids: &[String]) -> CoreResult<Vec<UserRecord>>;
}

/// HTTP adapter for the user service.
///
/// `GET {base}/api/v1/users/{id}` for single lookups (404 → absent) and
/// `POST {base}/api/v1/users/batch` for batch lookups.
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn get_by_id(&self, user_id: &str) -> CoreResult<Option<UserRecord>> {
        let url = format!("{}/api/v1/users/{user_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Directory(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| CoreError::Directory(format!("GET {url}: {e}")))?;

        let user = response
            .json::<UserRecord>()
            .await
            .map_err(|e| CoreError::Directory(format!("GET {url}: invalid body: {e}")))?;
        Ok(Some(user))
    }

    async fn get_by_ids(&self, user_ids: &[String]) -> CoreResult<Vec<UserRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/v1/users/batch", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&user_ids)
            .send()
            .await
            .map_err(|e| CoreError::Directory(format!("POST {url}: {e}")))?
            .error_for_status()
            .map_err(|e| CoreError::Directory(format!("POST {url}: {e}")))?;

        response
            .json::<Vec<UserRecord>>()
            .await
            .map_err(|e| CoreError::Directory(format!("POST {url}: invalid body: {e}")))
    }
}

/// Map-backed directory for local runs and tests.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, user: UserRecord) {
        self.users
            .write()
            .expect("directory lock poisoned")
            .insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_by_id(&self, user_id: &str) -> CoreResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .map_err(|_| CoreError::Directory("directory lock poisoned".into()))?
            .get(user_id)
            .cloned())
    }

    async fn get_by_ids(&self, user_ids: &[String]) -> CoreResult<Vec<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| CoreError::Directory("directory lock poisoned".into()))?;
        Ok(user_ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, first: &str, last: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            email: format!("{first}@example.test").to_lowercase(),
            first_name: first.into(),
            last_name: last.into(),
            phone_number: None,
            birth_date: None,
            gender: None,
        }
    }

    #[tokio::test]
    async fn test_batch_lookup_omits_missing_ids() {
        let directory = MemoryDirectory::new();
        directory.put(user("u-1", "John", "Smith"));
        directory.put(user("u-3", "Amy", "Lee"));

        let found = directory
            .get_by_ids(&["u-1".into(), "u-2".into(), "u-3".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(directory.get_by_id("u-2").await.unwrap().is_none());
    }

    #[test]
    fn test_age_requires_birth_date() {
        let mut u = user("u-1", "John", "Smith");
        assert_eq!(u.age(), None);

        u.birth_date = NaiveDate::from_ymd_opt(1990, 6, 1);
        let age = u.age().unwrap();
        assert!(age >= 30, "age was {age}");
    }
}
