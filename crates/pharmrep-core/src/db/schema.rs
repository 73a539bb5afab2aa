//! SQLite schema definition.

/// Local persistence schema: the catalog snapshot and a small key/value store.
///
/// Only the catalog survives across sessions. Visit drafts are never written here.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Product Catalog (snapshot of the last server response)
-- ============================================================================

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,                    -- order in the server response
    name TEXT NOT NULL,
    code TEXT NOT NULL DEFAULT '',
    price REAL NOT NULL DEFAULT 0,
    product_type TEXT,
    brand TEXT,
    company TEXT,
    team TEXT,
    messages TEXT NOT NULL DEFAULT '[]',          -- JSON array of strings
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FTS5 virtual table for the order form's product search
CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
    name,
    code,
    brand,
    content='products',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS products_ai AFTER INSERT ON products BEGIN
    INSERT INTO products_fts(rowid, name, code, brand)
    VALUES (new.rowid, new.name, new.code, new.brand);
END;

CREATE TRIGGER IF NOT EXISTS products_ad AFTER DELETE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, name, code, brand)
    VALUES ('delete', old.rowid, old.name, old.code, old.brand);
END;

CREATE TRIGGER IF NOT EXISTS products_au AFTER UPDATE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, name, code, brand)
    VALUES ('delete', old.rowid, old.name, old.code, old.brand);
    INSERT INTO products_fts(rowid, name, code, brand)
    VALUES (new.rowid, new.name, new.code, new.brand);
END;

CREATE INDEX IF NOT EXISTS idx_products_position ON products(position);
CREATE INDEX IF NOT EXISTS idx_products_team ON products(team);

-- ============================================================================
-- Pharmacies
-- ============================================================================

CREATE TABLE IF NOT EXISTS pharmacies (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    area TEXT,
    city TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_pharmacies_position ON pharmacies(position);

-- ============================================================================
-- Local Storage (key/value: auth token, sync markers)
-- ============================================================================

CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO local_storage (key, value) VALUES ('catalog_last_sync', '');
"#;
