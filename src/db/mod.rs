pub mod from_row;
pub mod queries;
pub mod schema;

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::audit::AuditWriter;
use crate::config::Config;
use crate::email::EmailService;
use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

pub fn open_pool(path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| configure(conn));
    let pool = Pool::builder().build(manager)?;
    Ok(pool)
}

/// Shared application state: the primary pool, the audit writer (own pool),
/// the outbound mailer, and the parsed configuration.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub audit: AuditWriter,
    pub email: EmailService,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let db = open_pool(Path::new(&config.database_path))?;
        schema::init_primary(&*db.get()?)?;

        let audit_pool = open_pool(Path::new(&config.audit_database_path))?;
        schema::init_audit(&*audit_pool.get()?)?;
        let audit = AuditWriter::new(audit_pool, config.audit_log_enabled);

        let email = EmailService::from_config(&config);

        Ok(Self {
            db,
            audit,
            email,
            config,
        })
    }
}
