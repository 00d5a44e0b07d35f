/*!
 * Transaction helpers shared by the zone and workflow services.
 */

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, TransactionError, TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Driver messages of a write refused because another transaction holds the lock: SQLite
/// busy/locked (including the extended busy codes) and PostgreSQL serialization failures.
const LOCK_CONTENTION_MARKERS: &[&str] = &[
    "database is locked",
    "database table is locked",
    "(code: 5)",
    "(code: 6)",
    "(code: 261)",
    "(code: 517)",
    "could not serialize access",
    "deadlock detected",
];

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction.
///
/// Commits when the closure returns `Ok`, rolls back otherwise. The closure's own
/// `ServiceError` is returned unchanged so callers can match on it.
///
/// ```rust,ignore
/// let zone = with_transaction(&*db, |txn| {
///     Box::pin(async move {
///         let zone = load(txn, id).await?;
///         persist(txn, zone).await
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<C, F, T>(db: &C, f: F) -> Result<T, ServiceError>
where
    C: TransactionTrait,
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send,
{
    db.transaction::<_, T, ServiceError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(err) => err,
        })
}

/// Whether `err` is the store refusing a write under lock contention. Such a write never
/// happened and is safe to retry.
pub fn is_lock_contention(err: &ServiceError) -> bool {
    let ServiceError::DatabaseError(db_err) = err else {
        return false;
    };
    let message = db_err.to_string().to_ascii_lowercase();
    LOCK_CONTENTION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Takes the write lock on row `id` before anything is read in `txn`.
///
/// The statement is a no-op `SET version = version`. On SQLite it upgrades the transaction
/// to a writer up front, so concurrent writers queue on the busy handler instead of failing
/// later on a stale snapshot; on PostgreSQL it holds the row lock.
pub async fn claim_row<E>(
    txn: &DatabaseTransaction,
    id_column: E::Column,
    version_column: E::Column,
    id: Uuid,
) -> Result<(), ServiceError>
where
    E: EntityTrait,
{
    E::update_many()
        .col_expr(version_column, Expr::col(version_column).into())
        .filter(id_column.eq(id))
        .exec(txn)
        .await?;
    Ok(())
}

/// Sleeps before retry number `attempt` of a contended write: exponential with jitter.
pub async fn retry_backoff(attempt: u32) {
    let base_ms = 5u64 << attempt.min(6);
    let jitter_ms = (Uuid::new_v4().as_u128() % u128::from(base_ms)) as u64;
    tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::municipality;
    use chrono::Utc;
    use sea_orm::{ActiveValue::Set, DbErr, PaginatorTrait};

    async fn pool() -> sea_orm::DatabaseConnection {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn municipality(name: &str) -> municipality::ActiveModel {
        let now = Utc::now();
        municipality::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            province: Set(None),
            postal_code_prefix: Set(None),
            population: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn commits_on_success() {
        let db = pool().await;
        with_transaction(&db, |txn| {
            Box::pin(async move {
                municipality::Entity::insert(municipality("Teruel"))
                    .exec_without_returning(txn)
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert_eq!(municipality::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rolls_back_and_returns_service_error() {
        let db = pool().await;
        let err = with_transaction(&db, |txn| {
            Box::pin(async move {
                municipality::Entity::insert(municipality("Soria"))
                    .exec_without_returning(txn)
                    .await?;
                Err::<(), _>(ServiceError::Conflict("stop".to_string()))
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(municipality::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[test]
    fn busy_and_serialization_failures_are_contention() {
        for message in [
            "error returned from database: (code: 5) database is locked",
            "error returned from database: (code: 517) database is locked",
            "error returned from database: could not serialize access due to concurrent update",
        ] {
            let err = ServiceError::DatabaseError(DbErr::Custom(message.to_string()));
            assert!(is_lock_contention(&err), "{}", message);
        }
    }

    #[test]
    fn other_failures_are_not_contention() {
        let err = ServiceError::DatabaseError(DbErr::Custom(
            "error returned from database: (code: 2067) UNIQUE constraint failed".to_string(),
        ));
        assert!(!is_lock_contention(&err));
        assert!(!is_lock_contention(&ServiceError::ConcurrentModification(Uuid::nil())));
        assert!(!is_lock_contention(&ServiceError::Conflict("database is locked".to_string())));
    }

    #[tokio::test]
    async fn claiming_a_missing_row_is_a_no_op() {
        let db = pool().await;
        with_transaction(&db, |txn| {
            Box::pin(async move {
                claim_row::<municipality::Entity>(
                    txn,
                    municipality::Column::Id,
                    municipality::Column::Name,
                    Uuid::new_v4(),
                )
                .await
            })
        })
        .await
        .unwrap();
    }
}
