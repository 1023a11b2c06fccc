use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CommandId, EventId, OrderId};
use domain::{Money, Order, OrderItem, OrderStatus, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{LedgerError, LedgerStore, OutboxEvent, ProcessedCommand, Result};

/// PostgreSQL-backed ledger implementation.
///
/// The orders, processed-commands, and outbox tables live in the same
/// database so a single transaction can span all three.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<OutboxEvent> {
        Ok(OutboxEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            aggregate_id: OrderId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            delivered: row.try_get("delivered")?,
            created_at: row.try_get("created_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get::<i64, _>("unit_price_cents")?),
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, user_id, status, total_amount_cents, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;

        let status: OrderStatus = row.try_get::<String, _>("status")?.parse()?;

        Ok(Some(Order::restore(
            order_id,
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            Money::from_cents(row.try_get::<i64, _>("total_amount_cents")?),
            items,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
        )))
    }

    async fn find_processed_command(
        &self,
        command_id: CommandId,
    ) -> Result<Option<ProcessedCommand>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT command_id, order_id, processed_at
            FROM processed_commands
            WHERE command_id = $1
            "#,
        )
        .bind(command_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(ProcessedCommand {
                command_id: CommandId::from_uuid(row.try_get::<Uuid, _>("command_id")?),
                order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                processed_at: row.try_get("processed_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn commit_new_order(
        &self,
        order: &Order,
        command: &ProcessedCommand,
        event: &OutboxEvent,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_amount_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.total_amount().cents())
        .bind(order.created_at())
        .execute(&mut *tx)
        .await?;

        for (line_no, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO processed_commands (command_id, order_id, processed_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(command.command_id.as_uuid())
        .bind(command.order_id.as_uuid())
        .bind(command.processed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A unique-key collision here means a concurrent caller won the
            // race for this command id; the caller re-reads their record.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("processed_commands_pkey")
            {
                return LedgerError::DuplicateCommand(command.command_id);
            }
            LedgerError::Database(e)
        })?;

        sqlx::query(
            r#"
            INSERT INTO outbox_events (event_id, aggregate_id, event_type, payload, delivered, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(event.aggregate_id.as_uuid())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.delivered)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn claim_pending_events(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEvent>> {
        let now = Utc::now();
        let leased_until = now + lease;

        // The sub-select skips rows locked by a concurrent worker; the
        // lease keeps them skipped until it expires, so a crashed worker
        // releases its claim without any explicit cleanup.
        let rows = sqlx::query(
            r#"
            UPDATE outbox_events
            SET claimed_until = $1
            WHERE event_id IN (
                SELECT event_id
                FROM outbox_events
                WHERE delivered = FALSE
                  AND (claimed_until IS NULL OR claimed_until < $2)
                ORDER BY created_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING event_id, aggregate_id, event_type, payload, delivered, created_at, delivered_at
            "#,
        )
        .bind(leased_until)
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;
        events.sort_by_key(|e| e.created_at);

        tracing::debug!(claimed = events.len(), "claimed pending outbox events");

        Ok(events)
    }

    async fn mark_delivered(&self, event_id: EventId, delivered_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET delivered = TRUE, delivered_at = $2, claimed_until = NULL
            WHERE event_id = $1 AND delivered = FALSE
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(delivered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
