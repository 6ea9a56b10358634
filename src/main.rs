use anyhow::Context;
use clap::{Parser, Subcommand};
use std::str::FromStr;

use plancast::config::Config;
use plancast::db::{AppState, queries};
use plancast::handlers;
use plancast::models::PlatformAdminRole;

#[derive(Parser)]
#[command(name = "plancast", about = "Multi-tenant planning service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Grant platform-admin authority to a user by email
    GrantAdmin {
        email: String,
        /// "admin" or "super_admin"
        #[arg(long, default_value = "admin")]
        role: String,
    },
    /// List platform-admin grants, revoked ones included
    ListAdmins,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plancast=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let state = AppState::new(config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::GrantAdmin { email, role } => grant_admin(&state, &email, &role),
        Command::ListAdmins => list_admins(&state),
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    spawn_audit_retention(&state);

    let addr = state.config.addr();
    let app = handlers::router(state);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    // Connect info feeds the per-client rate limiter behind any proxy headers.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Age out tenant activity events past the retention window, daily. Admin
/// actions are never purged. Zero retention days disables the sweep.
fn spawn_audit_retention(state: &AppState) {
    let retention_days = state.config.audit_log_retention_days;
    if retention_days <= 0 {
        return;
    }
    let audit = state.audit.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            tick.tick().await;
            match audit.purge_expired(retention_days) {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired activity events"),
                Err(e) => tracing::warn!(error = %e, "Audit retention purge failed"),
            }
        }
    });
}

/// Operational escape hatch: seed a grant without going through the API.
/// Recorded in the grant row itself (granted_by is null).
fn grant_admin(state: &AppState, email: &str, role: &str) -> anyhow::Result<()> {
    let role = PlatformAdminRole::from_str(role)
        .map_err(|_| anyhow::anyhow!("role must be \"admin\" or \"super_admin\""))?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_email(&conn, email)?
        .with_context(|| format!("no user with email {email}"))?;
    if queries::get_active_admin_by_user_id(&conn, &user.id)?.is_some() {
        anyhow::bail!("{email} already holds an active grant");
    }

    let admin = queries::insert_platform_admin(&conn, &user, role, None)?;
    println!("granted {} to {} ({})", admin.role.as_ref(), user.email, admin.id);
    Ok(())
}

fn list_admins(state: &AppState) -> anyhow::Result<()> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT email, role, created_at, revoked_at FROM platform_admins ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, Option<i64>>(3)?,
        ))
    })?;

    for row in rows {
        let (email, role, created_at, revoked_at) = row?;
        let status = match revoked_at {
            Some(at) => format!("revoked at {at}"),
            None => "active".to_string(),
        };
        println!("{email}\t{role}\tgranted {created_at}\t{status}");
    }
    for email in &state.config.bootstrap_admin_emails {
        println!("{email}\tsuper_admin\tbootstrap allow-list\tactive");
    }
    Ok(())
}
