use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError, operation::put_item::PutItemError, types::AttributeValue, Client,
};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};
use serde_json::Value;
use tracing::debug;

use super::{CreateOutcome, RecordKind, Store, User};

const EMAIL_INDEX: &str = "EmailIndex";

/// DynamoDB-backed store. Tables are `{prefix}-users` plus one table per
/// record kind, all keyed by a string `id` attribute; users carry a global
/// secondary index on `email`.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table_prefix: String,
}

impl DynamoStore {
    pub async fn connect(table_prefix: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&sdk_config),
            table_prefix: table_prefix.into(),
        }
    }

    fn table(&self, suffix: &str) -> String {
        format!("{}-{}", self.table_prefix, suffix)
    }
}

#[async_trait]
impl Store for DynamoStore {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let out = self
            .client
            .get_item()
            .table_name(self.table("users"))
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .context("dynamodb get_item failed")?;
        match out.item {
            Some(item) => Ok(Some(from_item(item).context("malformed user item")?)),
            None => Ok(None),
        }
    }

    async fn find_password_user(&self, email: &str) -> anyhow::Result<Option<User>> {
        let out = self
            .client
            .query()
            .table_name(self.table("users"))
            .index_name(EMAIL_INDEX)
            .key_condition_expression("email = :email")
            .filter_expression("#p = :p")
            .expression_attribute_names("#p", "provider")
            .expression_attribute_values(":email", AttributeValue::S(email.to_string()))
            .expression_attribute_values(":p", AttributeValue::S("email".to_string()))
            .send()
            .await
            .context("dynamodb query on email index failed")?;
        match out.items.unwrap_or_default().into_iter().next() {
            Some(item) => Ok(Some(from_item(item).context("malformed user item")?)),
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: User) -> anyhow::Result<CreateOutcome> {
        let item = to_item(&user).context("serialize user item")?;
        let result = self
            .client
            .put_item()
            .table_name(self.table("users"))
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await;
        match result {
            Ok(_) => {
                debug!(user_id = %user.id, "user created");
                Ok(CreateOutcome::Created(user))
            }
            Err(SdkError::ServiceError(err))
                if matches!(err.err(), PutItemError::ConditionalCheckFailedException(_)) =>
            {
                // Lost a creation race; hand back the record that won.
                let existing = self
                    .get_user(&user.id)
                    .await?
                    .ok_or_else(|| anyhow!("user {} missing after conditional put", user.id))?;
                Ok(CreateOutcome::Exists(existing))
            }
            Err(err) => Err(err).context("dynamodb put_item failed"),
        }
    }

    async fn list_records(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>> {
        let out = self
            .client
            .scan()
            .table_name(self.table(kind.as_str()))
            .send()
            .await
            .context("dynamodb scan failed")?;
        out.items
            .unwrap_or_default()
            .into_iter()
            .map(|item| from_item(item).context("malformed record item"))
            .collect()
    }

    async fn put_record(&self, kind: RecordKind, record: Value) -> anyhow::Result<()> {
        let item = to_item(record).context("serialize record item")?;
        self.client
            .put_item()
            .table_name(self.table(kind.as_str()))
            .set_item(Some(item))
            .send()
            .await
            .context("dynamodb put_item failed")?;
        Ok(())
    }
}
