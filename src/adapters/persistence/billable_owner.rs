use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_sync::OwnerRepo,
    domain::entities::{billable_owner::BillableOwnerProfile, payment_processor::PaymentProcessor},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> BillableOwnerProfile {
    BillableOwnerProfile {
        id: row.get("id"),
        owner_type: row.get("owner_type"),
        owner_id: row.get("owner_id"),
        processor: row.get("processor"),
        processor_id: row.get("processor_id"),
        processor_account: row.get("processor_account"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl OwnerRepo for PostgresPersistence {
    async fn find_billable(
        &self,
        processor: PaymentProcessor,
        processor_customer_id: &str,
    ) -> AppResult<Option<BillableOwnerProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_type, owner_id, processor, processor_id, processor_account, created_at
            FROM billing_customers
            WHERE processor = $1 AND processor_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(processor)
        .bind(processor_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }
}
