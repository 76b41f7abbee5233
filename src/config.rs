use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_access_ttl_secs: i64,

    // Verification tokens
    pub token_window_secs: i64,
    pub token_code_length: usize,
    pub token_issue_max: u32,
    pub token_issue_window_secs: u64,

    /// Reported to the points ledger on a verified check-in; never applied here.
    pub verification_bonus_points: i32,
}

impl Config {
    pub fn from_env() -> Self {
        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => panic!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        Self {
            storage_backend,
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .expect("JWT_ACCESS_TTL_SECS must be a number"),

            token_window_secs: env::var("TOKEN_WINDOW_SECS")
                .unwrap_or_else(|_| "600".into()) // 10 minutes
                .parse()
                .expect("TOKEN_WINDOW_SECS must be a number"),
            token_code_length: env::var("TOKEN_CODE_LENGTH")
                .unwrap_or_else(|_| "6".into())
                .parse()
                .expect("TOKEN_CODE_LENGTH must be a number"),
            token_issue_max: env::var("TOKEN_ISSUE_MAX")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            token_issue_window_secs: env::var("TOKEN_ISSUE_WINDOW_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()
                .unwrap_or(300),

            verification_bonus_points: env::var("VERIFICATION_BONUS_POINTS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
