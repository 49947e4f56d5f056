use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum IdentityBackend {
    /// argon2 credentials in the `auth_identities` table.
    Local,
    Supabase(SupabaseConfig),
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub store: StoreBackend,
    pub identity: IdentityBackend,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match env_opt("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };

        let identity = match env_opt("IDENTITY_PROVIDER").as_deref() {
            None | Some("local") => IdentityBackend::Local,
            Some("memory") => IdentityBackend::Memory,
            Some("supabase") => IdentityBackend::Supabase(SupabaseConfig {
                url: std::env::var("SUPABASE_URL")?,
                anon_key: std::env::var("SUPABASE_ANON_KEY")?,
                service_role_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            }),
            Some(other) => anyhow::bail!("unknown IDENTITY_PROVIDER {other:?}"),
        };

        let cfg = Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            store,
            identity,
        };
        if cfg.needs_database() && cfg.database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required for the postgres store or local identities");
        }
        Ok(cfg)
    }

    /// Fully in-process configuration; no database, no network.
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            db_max_connections: 1,
            store: StoreBackend::Memory,
            identity: IdentityBackend::Memory,
        }
    }

    /// Backend name for logs; never exposes keys.
    pub fn identity_kind(&self) -> &'static str {
        match self.identity {
            IdentityBackend::Local => "local",
            IdentityBackend::Supabase(_) => "supabase",
            IdentityBackend::Memory => "memory",
        }
    }

    pub fn needs_database(&self) -> bool {
        self.store == StoreBackend::Postgres || matches!(self.identity, IdentityBackend::Local)
    }
}
