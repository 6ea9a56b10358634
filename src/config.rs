use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub audit_database_path: String,
    pub base_url: String,
    /// Comma-separated operator emails allowed the bootstrap admin fallback.
    /// These produce synthetic, never-persisted grants (see `auth::admin`).
    pub bootstrap_admin_emails: Vec<String>,
    pub dev_mode: bool,
    /// Enable/disable audit logging entirely
    pub audit_log_enabled: bool,
    /// Days to retain tenant activity events before purging (0 = never purge)
    pub audit_log_retention_days: i64,
    /// Absolute session lifetime
    pub session_ttl_hours: i64,
    /// One-time code lifetime
    pub otp_ttl_minutes: i64,
    pub resend_api_key: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PLANCAST_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let audit_log_enabled = env::var("AUDIT_LOG_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let audit_log_retention_days: i64 = env::var("AUDIT_LOG_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(90);

        let session_ttl_hours: i64 = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 7);

        let otp_ttl_minutes: i64 = env::var("OTP_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "plancast.db".to_string()),
            audit_database_path: env::var("AUDIT_DATABASE_PATH")
                .unwrap_or_else(|_| "plancast_audit.db".to_string()),
            base_url,
            bootstrap_admin_emails: parse_email_list(
                env::var("BOOTSTRAP_ADMIN_EMAILS").ok().as_deref(),
            ),
            dev_mode,
            audit_log_enabled,
            audit_log_retention_days,
            session_ttl_hours,
            otp_ttl_minutes,
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Plancast <noreply@plancast.app>".to_string()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether an email is on the static operator allow-list.
    /// Matching is case-insensitive; the list is normalized at load time.
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.bootstrap_admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_email_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
