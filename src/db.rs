use crate::orm::{messages, subjects, users};
use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

#[inline(always)]
pub fn get_db_pool() -> &'static DatabaseConnection {
    unsafe { DB_POOL.get_unchecked() }
}

/// Opens the database URL and initializes the DB_POOL static.
pub async fn init_db(database_url: String) -> &'static DatabaseConnection {
    let mut opt = ConnectOptions::new(database_url.clone());
    // An in-memory SQLite database exists per connection, so it must not be
    // spread across a pool.
    if database_url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(16).min_connections(1);
    }
    opt.connect_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    let pool = Database::connect(opt)
        .await
        .expect("Database connection was not established.");
    create_missing_tables(&pool)
        .await
        .expect("failed to create missing tables");

    if DB_POOL.set(pool).is_err() {
        log::warn!("init_db: DB_POOL was already initialized; keeping the first pool");
    }

    DB_POOL
        .get()
        .expect("DatabaseConnection in DB_POOL failed in init_db()")
}

/// Creates any table that does not exist yet from the entity definitions, so
/// a fresh database file is usable on first boot. Referenced tables first.
async fn create_missing_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(subjects::Entity),
        schema.create_table_from_entity(messages::Entity),
    ];
    for statement in statements.iter_mut() {
        db.execute(backend.build(statement.if_not_exists())).await?;
    }

    Ok(())
}
