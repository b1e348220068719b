use sqlx::PgPool;

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entity_records (
            seq          BIGSERIAL PRIMARY KEY,
            entity_type  TEXT NOT NULL,
            id           TEXT NOT NULL,
            data         JSONB NOT NULL,
            UNIQUE (entity_type, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS entity_records_data_idx
            ON entity_records USING GIN (data jsonb_path_ops)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            key_id      TEXT NOT NULL UNIQUE,
            key_hash    TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            account_id  TEXT,
            profile_id  TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            revoked_at  TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
