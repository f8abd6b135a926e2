use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::{
        helpers::item_reconciler::ItemReplacementPlan,
        use_cases::subscription_sync::{LifecycleUpdate, SaveSubscriptionInput, SubscriptionRepo},
    },
    domain::entities::{
        payment_processor::PaymentProcessor, subscription::SubscriptionProfile,
        subscription_item::SubscriptionItemProfile,
    },
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        processor: row.get("processor"),
        processor_id: row.get("processor_id"),
        name: row.get("name"),
        processor_plan: row.get("processor_plan"),
        quantity: row.get("quantity"),
        status: row.get("status"),
        trial_ends_at: row.get("trial_ends_at"),
        ends_at: row.get("ends_at"),
        application_fee_percent: row.get("application_fee_percent"),
        processor_account: row.get("processor_account"),
        prorate: row.get("prorate"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_item(row: &sqlx::postgres::PgRow) -> SubscriptionItemProfile {
    SubscriptionItemProfile {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        processor_id: row.get("processor_id"),
        processor_price: row.get("processor_price"),
        quantity: row.get("quantity"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, owner_id, processor, processor_id, name, processor_plan, quantity, status,
    trial_ends_at, ends_at, application_fee_percent, processor_account, prorate,
    created_at, updated_at
"#;

const ITEM_SELECT_COLS: &str =
    "id, subscription_id, processor_id, processor_price, quantity, created_at";

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn find_by_processor_id(
        &self,
        processor: PaymentProcessor,
        processor_id: &str,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE processor = $1 AND processor_id = $2",
            SELECT_COLS
        ))
        .bind(processor)
        .bind(processor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn save(&self, input: &SaveSubscriptionInput) -> AppResult<SubscriptionProfile> {
        // Concurrent first syncs of one subscription converge on a single row.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, owner_id, processor, processor_id, name, processor_plan, quantity, status,
                trial_ends_at, ends_at, application_fee_percent, processor_account
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (processor, processor_id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                name = EXCLUDED.name,
                processor_plan = EXCLUDED.processor_plan,
                quantity = EXCLUDED.quantity,
                status = EXCLUDED.status,
                trial_ends_at = EXCLUDED.trial_ends_at,
                ends_at = COALESCE(EXCLUDED.ends_at, subscriptions.ends_at),
                application_fee_percent = EXCLUDED.application_fee_percent,
                processor_account = EXCLUDED.processor_account,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.owner_id)
        .bind(input.processor)
        .bind(&input.processor_id)
        .bind(&input.name)
        .bind(&input.processor_plan)
        .bind(input.quantity)
        .bind(input.status)
        .bind(input.trial_ends_at)
        .bind(input.ends_at)
        .bind(input.application_fee_percent)
        .bind(&input.processor_account)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn list_items(&self, subscription_id: Uuid) -> AppResult<Vec<SubscriptionItemProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_items WHERE subscription_id = $1 ORDER BY processor_id",
            ITEM_SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn replace_items(
        &self,
        subscription_id: Uuid,
        plan: &ItemReplacementPlan,
    ) -> AppResult<Vec<SubscriptionItemProfile>> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Serializes concurrent replacements for the same subscription
        let locked = sqlx::query("SELECT id FROM subscriptions WHERE id = $1 FOR UPDATE")
            .bind(subscription_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::from)?;
        if locked.is_none() {
            return Err(AppError::InvalidInput("Referenced record not found".into()));
        }

        // The whole stored set goes, including rows written since the plan was built
        let removed = sqlx::query("DELETE FROM subscription_items WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?
            .rows_affected();
        if removed != plan.removals.len() as u64 {
            tracing::debug!(
                subscription_id = %subscription_id,
                planned = plan.removals.len(),
                removed,
                "Item set changed since planning"
            );
        }

        for item in &plan.inserts {
            sqlx::query(
                r#"
                INSERT INTO subscription_items (id, subscription_id, processor_id, processor_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(subscription_id)
            .bind(&item.processor_id)
            .bind(&item.processor_price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_items WHERE subscription_id = $1 ORDER BY processor_id",
            ITEM_SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn update_lifecycle(
        &self,
        id: Uuid,
        update: &LifecycleUpdate,
    ) -> AppResult<SubscriptionProfile> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions
            SET status = COALESCE($2, status), ends_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.ends_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_profile).ok_or(AppError::NotFound)
    }
}
