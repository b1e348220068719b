use scopegate_core::document::Document;
use sqlx::types::Json;

use crate::record::{Record, SortKey};
use crate::traits::{ListOptions, StorageError};

fn to_storage_error(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn to_sql_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}

// `param` is the placeholder index the sort field will be bound to. JSON null
// folds into SQL NULL so it sorts with missing fields.
fn order_clause(sort: Option<&SortKey>, param: usize) -> String {
    match sort {
        Some(key) if key.descending => format!(
            "ORDER BY NULLIF(data -> ${param}::text, 'null'::jsonb) DESC NULLS LAST, seq ASC"
        ),
        Some(_) => format!(
            "ORDER BY NULLIF(data -> ${param}::text, 'null'::jsonb) ASC NULLS FIRST, seq ASC"
        ),
        None => "ORDER BY seq ASC".to_string(),
    }
}

// Every key of the document bound at `param` must hold an equal value. Values
// are compared by their canonical jsonb text so `1.0` and `1` stay distinct and
// arrays or objects must match whole, not by containment. A NULL document
// matches everything.
fn equality_clause(param: usize) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM jsonb_each(${param}::jsonb) AS q \
         WHERE (data -> q.key)::text IS DISTINCT FROM q.value::text)"
    )
}

pub async fn select_records<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    query: Option<&Document>,
    options: &ListOptions,
) -> Result<Vec<Record>, StorageError> {
    let sort = options.sort.as_deref().and_then(SortKey::parse);
    let sql = format!(
        r#"
        SELECT data FROM entity_records
        WHERE entity_type = $1 AND {}
        {}
        LIMIT $3
        "#,
        equality_clause(2),
        order_clause(sort.as_ref(), 4)
    );

    let mut q = sqlx::query_as::<_, (Json<Record>,)>(&sql)
        .bind(entity)
        .bind(query.map(Json))
        .bind(to_sql_limit(options.limit));
    if let Some(ref key) = sort {
        q = q.bind(key.field.clone());
    }

    let rows = q.fetch_all(executor).await.map_err(to_storage_error)?;
    Ok(rows.into_iter().map(|(Json(record),)| record).collect())
}

pub async fn select_record<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    id: &str,
) -> Result<Option<Record>, StorageError> {
    let row = sqlx::query_as::<_, (Json<Record>,)>(
        "SELECT data FROM entity_records WHERE entity_type = $1 AND id = $2",
    )
    .bind(entity)
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(to_storage_error)?;
    Ok(row.map(|(Json(record),)| record))
}

pub async fn insert_record<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    id: &str,
    record: &Record,
) -> Result<(), StorageError> {
    sqlx::query("INSERT INTO entity_records (entity_type, id, data) VALUES ($1, $2, $3)")
        .bind(entity)
        .bind(id)
        .bind(Json(record))
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(())
}

pub async fn merge_record<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    id: &str,
    patch: &Document,
    guard: Option<&Document>,
) -> Result<Option<Record>, StorageError> {
    let sql = format!(
        r#"
        UPDATE entity_records SET data = data || $3::jsonb
        WHERE entity_type = $1 AND id = $2 AND {}
        RETURNING data
        "#,
        equality_clause(4)
    );
    let row = sqlx::query_as::<_, (Json<Record>,)>(&sql)
        .bind(entity)
        .bind(id)
        .bind(Json(patch))
        .bind(guard.map(Json))
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(|(Json(record),)| record))
}

pub async fn delete_record<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    id: &str,
    guard: Option<&Document>,
) -> Result<bool, StorageError> {
    let sql = format!(
        r#"
        DELETE FROM entity_records
        WHERE entity_type = $1 AND id = $2 AND {}
        "#,
        equality_clause(3)
    );
    let result = sqlx::query(&sql)
        .bind(entity)
        .bind(id)
        .bind(guard.map(Json))
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn record_exists<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    entity: &str,
    id: &str,
) -> Result<bool, StorageError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM entity_records WHERE entity_type = $1 AND id = $2)",
    )
    .bind(entity)
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(to_storage_error)?;
    Ok(row.0)
}
