use kernel::model::audit::NewAuditLog;
use kernel::model::id::AuditLogId;
use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::{postgres::PgConnectOptions, PgPool};

pub mod model;

fn make_pg_connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .password(&cfg.password)
        .database(&cfg.database)
}

#[derive(Clone)]
pub struct ConnectionPool(PgPool);

impl ConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }

    pub fn inner_ref(&self) -> &PgPool {
        &self.0
    }

    pub async fn begin(&self) -> AppResult<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.0.begin().await.map_err(AppError::TransactionError)
    }
}

pub fn connect_database_with(cfg: &DatabaseConfig) -> ConnectionPool {
    ConnectionPool(PgPool::connect_lazy_with(make_pg_connect_options(cfg)))
}

// 状態を変える遷移と同一トランザクションで監査ログを残すためのヘルパ。
// スイーパーや Webhook などシステム起点の遷移でも省略しない
pub(crate) async fn append_audit_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    log: NewAuditLog,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            INSERT INTO audit_logs
            (audit_log_id, action, entity_type, entity_id, before_state, after_state, actor, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(AuditLogId::new())
    .bind(log.action.as_ref())
    .bind(&log.entity_type)
    .bind(&log.entity_id)
    .bind(&log.before)
    .bind(&log.after)
    .bind(&log.actor)
    .bind(&log.reason)
    .execute(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No audit log record has been created".into(),
        ));
    }

    Ok(())
}
