//! Customer lookup repository.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use super::model::Customer;
use crate::Result;
use crate::thread::CustomerId;

/// Repository over the customer projection table.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a customer row (used by CRM import glue and tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, name: &str, email: &str) -> Result<Customer> {
        let result = sqlx::query("INSERT INTO customers (name, email) VALUES (?, ?)")
            .bind(name)
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(Customer {
            id: CustomerId(result.last_insert_rowid()),
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Looks up a customer by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, name, email FROM customers WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Customer {
            id: CustomerId(row.get("id")),
            name: row.get("name"),
            email: row.get("email"),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::Database;
    use crate::thread::CustomerId;

    #[tokio::test]
    async fn create_and_find() {
        let db = Database::in_memory().await.unwrap();
        let customers = db.customers();

        let created = customers.create("Acme GmbH", "buyer@acme.test").await.unwrap();
        let found = customers.find(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Acme GmbH");
        assert_eq!(found.email, "buyer@acme.test");
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.customers().find(CustomerId(999)).await.unwrap().is_none());
    }
}
