/// Row of the `kv_store` table. `data` is a JSON document.
#[derive(Debug, sqlx::FromRow)]
pub struct KvRow {
    pub key: String,
    pub version: i64,
    pub data: String,
    pub updated_at: i64,
}
