//! # Client Repository
//!
//! Billing client CRUD and search. The reserved generic-public client
//! (seeded by migration) can be read but never updated or deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use verde_core::validation::{validate_name, validate_rfc};
use verde_core::{Client, GENERIC_PUBLIC_CLIENT_ID};

const CLIENT_COLUMNS: &str = "id, name, email, phone, rfc, fiscal_regime, postal_code, cfdi_use, created_at, updated_at";

/// Input for creating or updating a client.
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rfc: String,
    pub fiscal_regime: Option<String>,
    pub postal_code: Option<String>,
    pub cfdi_use: Option<String>,
}

impl ClientInput {
    fn validate(&self) -> DbResult<()> {
        validate_name(&self.name).map_err(DbError::InvalidInput)?;
        validate_rfc(&self.rfc).map_err(DbError::InvalidInput)?;
        Ok(())
    }
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a new client.
    pub async fn create(&self, input: ClientInput) -> DbResult<Client> {
        input.validate()?;

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            rfc: input.rfc.trim().to_uppercase(),
            fiscal_regime: input.fiscal_regime,
            postal_code: input.postal_code,
            cfdi_use: input.cfdi_use,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %client.id, rfc = %client.rfc, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, phone, rfc, fiscal_regime, postal_code, cfdi_use, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.rfc)
        .bind(&client.fiscal_regime)
        .bind(&client.postal_code)
        .bind(&client.cfdi_use)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Lists all clients, generic-public first, then alphabetical.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY (id = ?1) DESC, name COLLATE NOCASE"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(GENERIC_PUBLIC_CLIENT_ID)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Case-insensitive search over name, RFC and email.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Client>> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE name LIKE ?1 COLLATE NOCASE
               OR rfc LIKE ?1 COLLATE NOCASE
               OR email LIKE ?1 COLLATE NOCASE
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Replaces the mutable fields of a client.
    pub async fn update(&self, id: &str, input: ClientInput) -> DbResult<Client> {
        if id == GENERIC_PUBLIC_CLIENT_ID {
            return Err(DbError::Conflict(
                "the generic public client is read-only".to_string(),
            ));
        }
        input.validate()?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?2, email = ?3, phone = ?4, rfc = ?5,
                fiscal_regime = ?6, postal_code = ?7, cfdi_use = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.rfc.trim().to_uppercase())
        .bind(&input.fiscal_regime)
        .bind(&input.postal_code)
        .bind(&input.cfdi_use)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Deletes a client.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        if id == GENERIC_PUBLIC_CLIENT_ID {
            return Err(DbError::Conflict(
                "the generic public client is read-only".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn input(name: &str, rfc: &str) -> ClientInput {
        ClientInput {
            name: name.to_string(),
            email: None,
            phone: None,
            rfc: rfc.to_string(),
            fiscal_regime: None,
            postal_code: None,
            cfdi_use: None,
        }
    }

    #[tokio::test]
    async fn test_create_search_update_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();

        let created = repo
            .create(input("Ferretería El Martillo", "FEM920304AB1"))
            .await
            .unwrap();
        assert_eq!(created.rfc, "FEM920304AB1");

        let found = repo.search("martillo", 10).await.unwrap();
        assert_eq!(found.len(), 1);

        let updated = repo
            .update(&created.id, input("Ferretería El Clavo", "FEM920304AB1"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Ferretería El Clavo");

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generic_public_client_is_protected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();

        let err = repo
            .update(GENERIC_PUBLIC_CLIENT_ID, input("Hijacked", "XAXX010101000"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let err = repo.delete(GENERIC_PUBLIC_CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_puts_generic_public_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();
        repo.create(input("Aaa Primera", "AAA010101AA1")).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all[0].id, GENERIC_PUBLIC_CLIENT_ID);
    }

    #[tokio::test]
    async fn test_invalid_rfc_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.clients().create(input("Nombre", "BAD")).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput(_)));
    }
}
