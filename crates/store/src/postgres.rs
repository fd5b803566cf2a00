//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId, ProductId, UserId, VariantId};
use domain::{
    Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product, ProductVariant, Role,
    Settlement, User,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{Store, UnitOfWork};

/// Constraint guarding the single live pending order per user.
const PENDING_ORDER_CONSTRAINT: &str = "orders_one_pending_per_user";

/// Constraint guarding one line item per (order, product, variant value).
const ITEM_CONSTRAINT: &str = "order_items_order_product_variant";

fn map_constraint(err: sqlx::Error, name: &'static str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(name)
    {
        return StoreError::Conflict(name);
    }
    StoreError::Database(err)
}

/// PostgreSQL store; cheap to clone, shares one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a fresh pool to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the SQL migrations bundled at the workspace root.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// One database transaction. Dropping it without `commit` rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        role: role.parse::<Role>()?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        product_type: row.try_get("product_type")?,
        gender: row.try_get("gender")?,
        is_active: row.try_get("is_active")?,
    })
}

fn variant_from_row(row: &PgRow) -> Result<ProductVariant> {
    Ok(ProductVariant {
        id: VariantId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        variant_value: row.try_get("variant_value")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get("stock")?,
        is_active: row.try_get("is_active")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let settlement: String = row.try_get("settlement")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        status: status.parse::<OrderStatus>()?,
        settlement: settlement.parse::<Settlement>()?,
        total: Money::from_cents(row.try_get("total_cents")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderItem {
        id: common::ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        product_type: row.try_get("product_type")?,
        gender: row.try_get("gender")?,
        variant_value: row.try_get("variant_value")?,
        unit_price: Money::from_cents(row.try_get("price_cents")?),
        quantity: quantity as u32,
        final_price: Money::from_cents(row.try_get("final_price_cents")?),
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    let status: String = row.try_get("status")?;
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        amount: Money::from_cents(row.try_get("amount_cents")?),
        status: status.parse::<PaymentStatus>()?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, role) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(user.role.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, product_type, gender, is_active
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, product_type, gender, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.product_type)
        .bind(&product.gender)
        .bind(product.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_variant(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<ProductVariant>> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, variant_value, price_cents, stock, is_active
            FROM product_variants
            WHERE product_id = $1 AND variant_value = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(variant_value)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(variant_from_row).transpose()
    }

    async fn insert_variant(&mut self, variant: &ProductVariant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, variant_value, price_cents, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(variant.id.as_uuid())
        .bind(variant.product_id.as_uuid())
        .bind(&variant.variant_value)
        .bind(variant.price.cents())
        .bind(variant.stock)
        .bind(variant.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_variant_price(&mut self, id: VariantId, price_cents: i64) -> Result<()> {
        sqlx::query("UPDATE product_variants SET price_cents = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(price_cents)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn debit_stock(&mut self, id: VariantId, quantity: u32) -> Result<bool> {
        // Check and decrement in one statement: under concurrent debits the
        // row lock serializes them and the `stock >= $2` predicate re-runs
        // against the committed value, so two callers can never both take
        // the last units.
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND stock >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity as i32)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn credit_stock(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
        quantity: u32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET stock = stock + $3, updated_at = NOW()
            WHERE product_id = $1 AND variant_value = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(variant_value)
        .bind(quantity as i32)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, settlement, total_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.settlement.as_str())
        .bind(order.total.cents())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_constraint(e, PENDING_ORDER_CONSTRAINT))?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, settlement = $3, total_cents = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.settlement.as_str())
        .bind(order.total.cents())
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, settlement, total_cents, created_at, updated_at
            FROM orders
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_pending_order(&mut self, user_id: UserId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, settlement, total_cents, created_at, updated_at
            FROM orders
            WHERE user_id = $1 AND status = 'pending' AND deleted_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, status, settlement, total_cents, created_at, updated_at
            FROM orders
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items
                (id, order_id, product_id, name, description, product_type, gender,
                 variant_value, price_cents, quantity, final_price_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.product_type)
        .bind(&item.gender)
        .bind(&item.variant_value)
        .bind(item.unit_price.cents())
        .bind(item.quantity as i32)
        .bind(item.final_price.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_constraint(e, ITEM_CONSTRAINT))?;
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            "UPDATE order_items SET quantity = $2, final_price_cents = $3 WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(item.quantity as i32)
        .bind(item.final_price.cents())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<OrderItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, product_id, name, description, product_type, gender,
                   variant_value, price_cents, quantity, final_price_cents
            FROM order_items
            WHERE order_id = $1 AND product_id = $2 AND variant_value = $3
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(variant_value)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn items_for_order(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, name, description, product_type, gender,
                   variant_value, price_cents, quantity, final_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, amount_cents, status, created_at, updated_at
            FROM payments
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn transition_payment(
        &mut self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<bool> {
        // Status guard in the predicate: racing confirms/retries collapse to
        // exactly one winner; the loser sees zero rows affected.
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
