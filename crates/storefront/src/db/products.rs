//! Product repository backed by `storefront.product`.
//!
//! The storefront only reads the catalog. Writes come from `cw-cli seed`
//! through [`ProductRepository::upsert`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use cartwright_core::{Price, Product, ProductId};

use super::{ProductStore, RepositoryError};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    images: Vec<String>,
    category: String,
    stock: i32,
    image_hint: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.stock, row.id
            ))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Price::new(row.price),
            images: row.images,
            category: row.category,
            stock,
            image_hint: row.image_hint,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, images, category, stock, image_hint";

/// Repository for catalog reads.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update products by id, in one transaction.
    ///
    /// Running it twice with the same catalog leaves the table unchanged.
    /// Products not in `products` are left alone. Returns the number of rows
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a stock level does not fit the
    /// column, or `RepositoryError::Database` if a write fails. Nothing is
    /// written in either case.
    #[instrument(skip_all, fields(count = products.len()))]
    pub async fn upsert(&self, products: &[Product]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for product in products {
            let stock = stock_column(product)?;
            let result = sqlx::query(
                r"
                INSERT INTO storefront.product
                    (id, name, description, price, images, category, stock, image_hint)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    price = EXCLUDED.price,
                    images = EXCLUDED.images,
                    category = EXCLUDED.category,
                    stock = EXCLUDED.stock,
                    image_hint = EXCLUDED.image_hint
                ",
            )
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.amount())
            .bind(&product.images)
            .bind(&product.category)
            .bind(stock)
            .bind(product.image_hint.as_deref())
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

fn stock_column(product: &Product) -> Result<i32, RepositoryError> {
    i32::try_from(product.stock).map_err(|_| {
        RepositoryError::Conflict(format!(
            "stock {} for product {} is out of range",
            product.stock, product.id
        ))
    })
}

#[async_trait]
impl ProductStore for ProductRepository {
    #[instrument(skip(self))]
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE category = $1 ORDER BY id"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM storefront.product ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(stock: i32) -> ProductRow {
        ProductRow {
            id: ProductId::new("prod_001"),
            name: "Chronograph Excellence".to_string(),
            description: "A watch".to_string(),
            price: Decimal::new(45000, 2),
            images: vec!["https://img.example.com/1.png".to_string()],
            category: "Watches".to_string(),
            stock,
            image_hint: Some("luxury watch".to_string()),
        }
    }

    #[test]
    fn test_row_converts_to_product() {
        let product = Product::try_from(row(15)).unwrap();
        assert_eq!(product.price, Price::from_cents(45000));
        assert_eq!(product.stock, 15);
        assert_eq!(stock_column(&product).unwrap(), 15);
    }

    #[test]
    fn test_negative_stock_is_corruption() {
        let err = Product::try_from(row(-1)).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_oversized_stock_is_refused_before_writing() {
        let mut product = Product::try_from(row(1)).unwrap();
        product.stock = u32::MAX;
        assert!(matches!(
            stock_column(&product),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database (STOREFRONT_DATABASE_URL)"]
    async fn test_upsert_is_idempotent_and_updates_in_place() {
        let url = std::env::var("STOREFRONT_DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let repo = ProductRepository::new(pool);

        let mut product = Product::try_from(row(15)).unwrap();
        product.id = ProductId::new("prod_upsert_test");
        product.category = "Upsert Test".to_string();

        repo.upsert(std::slice::from_ref(&product)).await.unwrap();
        repo.upsert(std::slice::from_ref(&product)).await.unwrap();
        assert_eq!(
            repo.list(Some("Upsert Test")).await.unwrap(),
            vec![product.clone()]
        );

        product.price = Price::from_cents(39900);
        product.stock = 3;
        repo.upsert(std::slice::from_ref(&product)).await.unwrap();
        let stored = repo.get(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.price, Price::from_cents(39900));
        assert_eq!(stored.stock, 3);
        assert!(repo.categories().await.unwrap().contains(&product.category));
    }
}
