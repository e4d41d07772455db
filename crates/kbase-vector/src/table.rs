//! LanceDB connection and housekeeping helpers.

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection};
use std::sync::Arc;

use kbase_core::{Error, Result};

use crate::schema::vector_dim;

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(|e| Error::Store(format!("open {}: {}", uri, e)))
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(Error::store)?;
    Ok(names.iter().any(|n| n == name))
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await.map_err(Error::store)?;
    Ok(())
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<lancedb::Table> {
    if !table_exists(conn, name).await? {
        return Err(Error::NotFound(format!("collection '{}'", name)));
    }
    conn.open_table(name).execute().await.map_err(|e| Error::Store(format!("open '{}': {}", name, e)))
}

pub async fn table_dim(table: &lancedb::Table) -> Result<Option<usize>> {
    let schema = table.schema().await.map_err(Error::store)?;
    Ok(vector_dim(&schema))
}

pub async fn count_rows(table: &lancedb::Table) -> Result<usize> {
    table.count_rows(None).await.map_err(Error::store)
}
