//! Catalog snapshot operations (products and pharmacies).

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::{Pharmacy, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, code, price, product_type, brand, company, team, messages";

impl Database {
    /// Replace the whole product snapshot, preserving the given order.
    pub fn replace_products(&self, products: &[Product]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM products", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO products (
                    id, position, name, code, price, product_type,
                    brand, company, team, messages
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    position = excluded.position,
                    name = excluded.name,
                    code = excluded.code,
                    price = excluded.price,
                    product_type = excluded.product_type,
                    brand = excluded.brand,
                    company = excluded.company,
                    team = excluded.team,
                    messages = excluded.messages,
                    updated_at = datetime('now')
                "#,
            )?;
            for (position, product) in products.iter().enumerate() {
                let messages_json = serde_json::to_string(&product.messages)?;
                stmt.execute(params![
                    product.id,
                    position as i64,
                    product.name,
                    product.code,
                    product.price,
                    product.product_type,
                    product.brand,
                    product.company,
                    product.team,
                    messages_json,
                ])?;
            }
        }
        tx.execute(
            "UPDATE local_storage SET value = ?1, updated_at = datetime('now') WHERE key = 'catalog_last_sync'",
            [chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// All products in server order.
    pub fn list_products(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY position", PRODUCT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], ProductRow::from_row)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.try_into()?);
        }
        Ok(products)
    }

    /// Search products by name, code or brand using FTS5 (BM25 ranking).
    pub fn search_products(&self, query: &str, limit: usize) -> DbResult<Vec<Product>> {
        let escaped_query = escape_fts_query(query);
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.code, p.price, p.product_type,
                   p.brand, p.company, p.team, p.messages,
                   bm25(products_fts) as rank
            FROM products p
            JOIN products_fts fts ON p.rowid = fts.rowid
            WHERE products_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(params![escaped_query, limit as i64], ProductRow::from_row)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.try_into()?);
        }
        Ok(products)
    }

    /// Replace the whole pharmacy snapshot, preserving the given order.
    pub fn replace_pharmacies(&self, pharmacies: &[Pharmacy]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM pharmacies", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO pharmacies (id, position, name, area, city)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    position = excluded.position,
                    name = excluded.name,
                    area = excluded.area,
                    city = excluded.city,
                    updated_at = datetime('now')
                "#,
            )?;
            for (position, pharmacy) in pharmacies.iter().enumerate() {
                stmt.execute(params![
                    pharmacy.id,
                    position as i64,
                    pharmacy.name,
                    pharmacy.area,
                    pharmacy.city,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All pharmacies in server order.
    pub fn list_pharmacies(&self) -> DbResult<Vec<Pharmacy>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, area, city FROM pharmacies ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok(Pharmacy {
                id: row.get(0)?,
                name: row.get(1)?,
                area: row.get(2)?,
                city: row.get(3)?,
            })
        })?;

        let mut pharmacies = Vec::new();
        for row in rows {
            pharmacies.push(row?);
        }
        Ok(pharmacies)
    }
}

/// Intermediate row struct for database mapping.
struct ProductRow {
    id: String,
    name: String,
    code: String,
    price: f64,
    product_type: Option<String>,
    brand: Option<String>,
    company: Option<String>,
    team: Option<String>,
    messages: String,
}

impl ProductRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            price: row.get(3)?,
            product_type: row.get(4)?,
            brand: row.get(5)?,
            company: row.get(6)?,
            team: row.get(7)?,
            messages: row.get(8)?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            code: row.code,
            price: row.price,
            product_type: row.product_type,
            brand: row.brand,
            company: row.company,
            team: row.team,
            messages: serde_json::from_str(&row.messages)?,
        })
    }
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}
