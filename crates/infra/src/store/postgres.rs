//! Postgres-backed catalog store.
//!
//! Items and recipes live in two tables. A recipe's ingredients are stored
//! embedded as a JSONB array, so an ingredient's `inventoryId` is just a value
//! with no foreign key: deleting an item leaves recipes pointing at nothing.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | ColumnDecode / Decode | N/A | `Serialization` |
//! | Other | N/A | `Backend` |
//!
//! ## Transactions
//!
//! `begin()` opens a SQL transaction. Reads made through it use
//! `SELECT ... FOR UPDATE`, so a concurrent craft touching the same rows waits
//! until this one commits or rolls back. Dropping the handle without commit
//! rolls back (sqlx issues the rollback when the `Transaction` is dropped).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use larder_inventory::{InventoryItem, InventoryItemId};
use larder_recipes::{Ingredient, Recipe, RecipeId};

use super::{CatalogStore, CatalogTransaction, StoreError};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS inventory_items (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        image TEXT NOT NULL,
        quantity BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS recipes (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        image TEXT NOT NULL,
        amount BIGINT NOT NULL DEFAULT 0 CHECK (amount >= 0),
        ingredients JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const ITEM_COLUMNS: &str = "id, name, category, image, quantity";
const RECIPE_COLUMNS: &str = "id, name, description, image, amount, ingredients";

/// Postgres-backed catalog store.
///
/// Cheap to clone: `PgPool` is a handle to a shared pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the tables exist.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the catalog tables if they are missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn insert_item(&self, item: InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, name, category, image, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.image)
        .bind(item.quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn get_inventory_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory_item", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn update_inventory_quantity(
        &self,
        id: InventoryItemId,
        quantity: i64,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE inventory_items SET quantity = $2 WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_inventory_quantity", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn delete_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "DELETE FROM inventory_items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id), err)]
    async fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recipes (id, name, description, image, amount, ingredients)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipe.id.as_uuid())
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.image)
        .bind(amount_to_column(recipe.amount)?)
        .bind(Json(&recipe.ingredients))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_recipe", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_recipes", e))?;
        rows.into_iter().map(Recipe::try_from).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_recipe", e))?;
        row.map(Recipe::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn delete_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "DELETE FROM recipes WHERE id = $1 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_recipe", e))?;
        row.map(Recipe::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresCatalogTransaction { tx: Some(tx) }))
    }
}

/// SQL transaction handle. `None` once committed.
struct PostgresCatalogTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresCatalogTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("transaction already committed".to_string()))
    }
}

#[async_trait]
impl CatalogTransaction for PostgresCatalogTransaction {
    async fn get_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let tx = self.tx()?;
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("tx_get_recipe", e))?;
        row.map(Recipe::try_from).transpose()
    }

    async fn lock_inventory_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError> {
        let mut wanted: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        // Row locks are taken in ORDER BY order, so every craft acquires them
        // in the same sequence.
        let tx = self.tx()?;
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(wanted)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("tx_lock_inventory_items", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_recipe_amount(&mut self, id: RecipeId, amount: u64) -> Result<(), StoreError> {
        let amount = amount_to_column(amount)?;
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE recipes SET amount = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(amount)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("tx_update_recipe_amount", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("recipe {id} does not exist")));
        }
        Ok(())
    }

    async fn update_inventory_quantity(&mut self, id: InventoryItemId, quantity: i64) -> Result<(), StoreError> {
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE inventory_items SET quantity = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(quantity)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("tx_update_inventory_quantity", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("inventory item {id} does not exist")));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Backend("transaction already committed".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn amount_to_column(amount: u64) -> Result<i64, StoreError> {
    i64::try_from(amount).map_err(|_| StoreError::Serialization(format!("craft count {amount} exceeds BIGINT")))
}

fn amount_from_column(amount: i64) -> Result<u64, StoreError> {
    u64::try_from(amount).map_err(|_| StoreError::Serialization(format!("negative craft count {amount} in recipes")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(format!("decode error in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    name: String,
    category: String,
    image: String,
    quantity: i64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            image: row.try_get("image")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        InventoryItem {
            id: InventoryItemId::from_uuid(row.id),
            name: row.name,
            category: row.category,
            image: row.image,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug)]
struct RecipeRow {
    id: uuid::Uuid,
    name: String,
    description: String,
    image: String,
    amount: i64,
    ingredients: Json<Vec<Ingredient>>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for RecipeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RecipeRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            amount: row.try_get("amount")?,
            ingredients: row.try_get("ingredients")?,
        })
    }
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = StoreError;

    fn try_from(row: RecipeRow) -> Result<Self, Self::Error> {
        Ok(Recipe {
            id: RecipeId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            image: row.image,
            amount: amount_from_column(row.amount)?,
            ingredients: row.ingredients.0,
        })
    }
}
