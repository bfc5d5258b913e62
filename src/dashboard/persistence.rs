use crate::dashboard::now_unix_ms;
use crate::error::AppError;
use sqlx::{Row, SqlitePool};

pub async fn load_string_list(
    pool: &SqlitePool,
    key: &str,
) -> Result<Option<Vec<String>>, AppError> {
    let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let raw: String = row.try_get("value")?;
    let mut bytes = raw.into_bytes();
    let values: Vec<String> = simd_json::serde::from_slice(bytes.as_mut_slice())?;
    Ok(Some(values))
}

pub async fn save_string_list(
    pool: &SqlitePool,
    key: &str,
    values: &[String],
) -> Result<(), AppError> {
    let encoded = simd_json::serde::to_string(&values)?;

    sqlx::query(
        "INSERT INTO kv_store (key, value, updated_at_ms) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at_ms=excluded.updated_at_ms",
    )
    .bind(key)
    .bind(encoded)
    .bind(now_unix_ms())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{initialize_pool_from_path, unique_db_path};

    #[tokio::test]
    async fn absent_key_loads_as_none() {
        let db_path = unique_db_path();
        let pool = initialize_pool_from_path(&db_path)
            .await
            .expect("pool initialization should succeed");

        let loaded = load_string_list(&pool, "favoriteCities")
            .await
            .expect("load should succeed");

        assert!(loaded.is_none());
        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn saved_list_is_stored_as_json_array() {
        let db_path = unique_db_path();
        let pool = initialize_pool_from_path(&db_path)
            .await
            .expect("pool initialization should succeed");
        let values = vec!["London".to_string(), "New York".to_string()];

        save_string_list(&pool, "favoriteCities", &values)
            .await
            .expect("first save should succeed");
        save_string_list(&pool, "favoriteCities", &values[..1])
            .await
            .expect("overwrite should succeed");

        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind("favoriteCities")
            .fetch_one(&pool)
            .await
            .expect("row should exist");
        assert_eq!(raw, r#"["London"]"#);

        let loaded = load_string_list(&pool, "favoriteCities")
            .await
            .expect("load should succeed");
        assert_eq!(loaded, Some(vec!["London".to_string()]));

        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn corrupt_value_is_reported() {
        let db_path = unique_db_path();
        let pool = initialize_pool_from_path(&db_path)
            .await
            .expect("pool initialization should succeed");
        sqlx::query("INSERT INTO kv_store (key, value, updated_at_ms) VALUES (?, ?, 0)")
            .bind("favoriteCryptos")
            .bind("{not a list")
            .execute(&pool)
            .await
            .expect("raw insert should succeed");

        let result = load_string_list(&pool, "favoriteCryptos").await;

        assert!(result.is_err());
        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }
}
