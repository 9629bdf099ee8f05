use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Which identity system vouches for a user. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Email,
    Google,
    Github,
    Microsoft,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Email => "email",
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Microsoft => "microsoft",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record as stored in the document store (camelCase field names).
///
/// `email` is nullable because GitHub may withhold it. `password_hash` exists
/// only for the `email` provider and must never reach a response payload; the
/// API returns `PublicUser` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role: Role,
    pub provider: Provider,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The record collections served under `/api`. Anything else is a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Participants,
    Projects,
    Tasks,
}

impl RecordKind {
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "participants" => Some(RecordKind::Participants),
            "projects" => Some(RecordKind::Projects),
            "tasks" => Some(RecordKind::Tasks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Participants => "participants",
            RecordKind::Projects => "projects",
            RecordKind::Tasks => "tasks",
        }
    }
}

/// Outcome of a put-if-absent user write. On a lost race the existing record
/// is returned so callers converge on one user per id.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(User),
    Exists(User),
}

impl CreateOutcome {
    pub fn into_user(self) -> User {
        match self {
            CreateOutcome::Created(user) | CreateOutcome::Exists(user) => user,
        }
    }
}

/// Document store boundary. Each operation is atomic per key; cross-request
/// serialization (e.g. two registrations racing on one email) is not provided
/// here and is documented at the handler level.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>>;

    /// Look up the password-based (`provider = "email"`) account for an email
    /// address via the email secondary index. Federated accounts sharing the
    /// address are distinct records and are not returned.
    async fn find_password_user(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Create the user unless a record with the same id already exists.
    async fn create_user(&self, user: User) -> anyhow::Result<CreateOutcome>;

    async fn list_records(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>>;

    async fn put_record(&self, kind: RecordKind, record: Value) -> anyhow::Result<()>;
}
