use sqlx::MySqlPool;
use tracing::info;

const SCHEMA: &str = include_str!("../db/schema.sql");

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Applies `db/schema.sql`. Every statement is `CREATE ... IF NOT EXISTS`.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema ready");
    Ok(())
}
