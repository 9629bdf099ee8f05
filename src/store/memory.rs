use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{CreateOutcome, Provider, RecordKind, Store, User};

/// In-process store used by `AppState::fake()` and tests. Mirrors the
/// per-key atomicity of the real store: `create_user` is put-if-absent.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    records: HashMap<RecordKind, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").users.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.users.get(id).cloned())
    }

    async fn find_password_user(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .users
            .values()
            .find(|u| u.provider == Provider::Email && u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_user(&self, user: User) -> anyhow::Result<CreateOutcome> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if let Some(existing) = inner.users.get(&user.id) {
            return Ok(CreateOutcome::Exists(existing.clone()));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(CreateOutcome::Created(user))
    }

    async fn list_records(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.records.get(&kind).cloned().unwrap_or_default())
    }

    async fn put_record(&self, kind: RecordKind, record: Value) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.records.entry(kind).or_default().push(record);
        Ok(())
    }
}
