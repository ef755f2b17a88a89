use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::error::{Advisory, LedgerError};
use crate::models::movement::{StockMovement, StockMovementType};

/// Before/after snapshot of one stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: Uuid,
    pub before: i32,
    pub after: i32,
}

impl StockChange {
    /// Reconstructs the snapshot from the value an increment returned.
    pub fn from_after(product_id: Uuid, after: i32, delta: i32) -> Self {
        StockChange {
            product_id,
            before: after - delta,
            after,
        }
    }

    pub fn delta(&self) -> i32 {
        self.after - self.before
    }
}

/// Advisory raised when a sale asks for more pairs than are on hand.
pub fn stock_shortfall(product_code: &str, requested: i32, available: i32) -> Option<Advisory> {
    (requested > available).then(|| Advisory::InsufficientStock {
        product_code: product_code.to_string(),
        requested,
        available,
    })
}

/// Atomically adds `delta` to `stock_normal` and logs the movement.
///
/// No floor is applied: a confirmed oversell leaves the counter negative.
pub(crate) async fn apply_stock_delta(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    delta: i32,
    movement_type: StockMovementType,
    reference_id: Option<Uuid>,
    user_id: Uuid,
    note: Option<&str>,
) -> Result<StockChange, LedgerError> {
    let after: Option<i32> = sqlx::query_scalar(
        "UPDATE productos SET stock_normal = stock_normal + $2 WHERE id = $1 RETURNING stock_normal",
    )
    .bind(product_id)
    .bind(delta)
    .fetch_optional(&mut **tx)
    .await?;

    let after = after.ok_or_else(|| LedgerError::not_found("product", product_id))?;
    let change = StockChange::from_after(product_id, after, delta);

    record_stock_movement(tx, &change, movement_type, reference_id, user_id, note).await?;

    info!(
        %product_id,
        delta,
        before = change.before,
        after = change.after,
        movement = ?movement_type,
        "Stock updated"
    );
    Ok(change)
}

/// Increments the returned-stock bucket through `incrementar_stock_producto`.
pub(crate) async fn increment_returned(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
    reference_id: Uuid,
    user_id: Uuid,
) -> Result<StockChange, LedgerError> {
    let after: Option<i32> = sqlx::query_scalar("SELECT incrementar_stock_producto($1, $2)")
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&mut **tx)
        .await?;

    let after = after.ok_or_else(|| LedgerError::not_found("product", product_id))?;
    let change = StockChange::from_after(product_id, after, quantity);

    record_stock_movement(
        tx,
        &change,
        StockMovementType::Return,
        Some(reference_id),
        user_id,
        Some("stock_returned"),
    )
    .await?;

    info!(%product_id, quantity, returned_after = after, "Returned stock incremented");
    Ok(change)
}

/// Moves `quantity` pairs from `stock_returned` to `stock_normal`.
///
/// Fails without mutation when the returned bucket holds fewer pairs.
pub(crate) async fn promote_returned(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
    user_id: Uuid,
) -> Result<StockChange, LedgerError> {
    let after: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE productos
        SET stock_returned = stock_returned - $2,
            stock_normal = stock_normal + $2
        WHERE id = $1 AND stock_returned >= $2
        RETURNING stock_normal
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut **tx)
    .await?;

    let after = after.ok_or_else(|| {
        LedgerError::validation(format!(
            "returned stock holds fewer than {} pairs",
            quantity
        ))
    })?;
    let change = StockChange::from_after(product_id, after, quantity);

    record_stock_movement(
        tx,
        &change,
        StockMovementType::Promotion,
        None,
        user_id,
        Some("stock_returned -> stock_normal"),
    )
    .await?;

    info!(%product_id, quantity, stock_after = after, "Returned stock promoted");
    Ok(change)
}

async fn record_stock_movement(
    tx: &mut Transaction<'_, Postgres>,
    change: &StockChange,
    movement_type: StockMovementType,
    reference_id: Option<Uuid>,
    user_id: Uuid,
    note: Option<&str>,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO movimientos_inventario (
            id, product_id, movement_type, quantity,
            stock_before, stock_after, reference_id, user_id, note
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(change.product_id)
    .bind(movement_type)
    .bind(change.delta())
    .bind(change.before)
    .bind(change.after)
    .bind(reference_id)
    .bind(user_id)
    .bind(note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Most recent stock movements, newest first.
pub async fn list_stock_movements(
    pool: &PgPool,
    product_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<StockMovement>, LedgerError> {
    let rows = sqlx::query_as::<_, StockMovement>(
        r#"
        SELECT id, product_id, movement_type, quantity, stock_before, stock_after,
               reference_id, user_id, note, created_at
        FROM movimientos_inventario
        WHERE ($1::uuid IS NULL OR product_id = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_from_increment_result() {
        let id = Uuid::new_v4();
        let change = StockChange::from_after(id, 15, -5);
        assert_eq!(change.before, 20);
        assert_eq!(change.after, 15);
        assert_eq!(change.delta(), -5);
    }

    #[test]
    fn oversell_can_go_negative() {
        let change = StockChange::from_after(Uuid::new_v4(), -2, -5);
        assert_eq!(change.before, 3);
    }

    #[test]
    fn shortfall_only_when_exceeding() {
        assert_eq!(stock_shortfall("74113", 5, 20), None);
        assert_eq!(stock_shortfall("74113", 20, 20), None);
        assert_eq!(
            stock_shortfall("74113", 21, 20),
            Some(Advisory::InsufficientStock {
                product_code: "74113".to_string(),
                requested: 21,
                available: 20,
            })
        );
    }
}
