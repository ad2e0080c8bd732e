//! DynamoDB-backed metadata store
//!
//! The table is keyed by `id` (partition) and `createdDate` (sort), so
//! lookups by id are queries and updates need the full key.

use super::attributes::{field_value_to_attribute, record_from_item};
use super::{CorrectableField, FieldValue, MetadataStore};
use crate::error::{VerifyError, VerifyResult};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use voislab_common::{RecordKey, TrackMetadataRecord};

/// Metadata table in DynamoDB
pub struct DynamoMetadataStore {
    client: Client,
    table: String,
}

impl DynamoMetadataStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn scan_all(&self) -> VerifyResult<Vec<TrackMetadataRecord>> {
        let mut records = Vec::new();
        let mut start_key = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    VerifyError::MetadataStore(format!(
                        "Failed to scan table {}: {}",
                        self.table,
                        DisplayErrorContext(&e)
                    ))
                })?;
            pages += 1;

            for item in page.items() {
                match record_from_item(item) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!(table = %self.table, "Skipping item: {}", e),
                }
            }

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!(table = %self.table, pages, records = records.len(), "Scanned table");
        Ok(records)
    }

    async fn get_by_id(&self, id: &str) -> VerifyResult<Option<TrackMetadataRecord>> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("id = :id")
            .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(|e| {
                VerifyError::MetadataStore(format!(
                    "Failed to query track {}: {}",
                    id,
                    DisplayErrorContext(&e)
                ))
            })?;

        output.items().first().map(record_from_item).transpose()
    }

    async fn update_field(
        &self,
        key: &RecordKey,
        field: CorrectableField,
        value: &FieldValue,
    ) -> VerifyResult<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key("id", AttributeValue::S(key.id.clone()))
            .key("createdDate", AttributeValue::S(key.created_date.clone()))
            .update_expression("SET #field = :value")
            .expression_attribute_names("#field", field.attribute())
            .expression_attribute_values(":value", field_value_to_attribute(value))
            .send()
            .await
            .map_err(|e| {
                VerifyError::MetadataStore(format!(
                    "Failed to update {} on track {}: {}",
                    field,
                    key.id,
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::debug!(track_id = %key.id, field = %field, value = %value, "Updated field");
        Ok(())
    }
}
