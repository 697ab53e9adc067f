use sqlx::PgPool;

const MIGRATIONS: [(&str, &str); 1] = [(
    "001_init_schema",
    include_str!("../../sql/001_init_schema.sql"),
)];

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" SERIAL PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TIMESTAMP NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    let pending: Vec<(&str, &str)> = MIGRATIONS
        .iter()
        .copied()
        .filter(|(name, _)| !applied.iter().any(|done| done == name))
        .collect();

    if pending.is_empty() {
        tracing::info!("Database is up to date, no migrations needed");
        return Ok(());
    }

    for (name, sql) in &pending {
        tracing::info!(migration = name, "Applying migration...");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Migration {
                name: name.to_string(),
                source: e,
            })?;
        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    tracing::info!(count = pending.len(), "Database migrations completed");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
