use std::env;
use std::str::FromStr;

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub production: bool,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_image_bytes: usize,
    pub auth_rate_limit_burst: u32,
    pub super_admin: Option<SuperAdminSeed>,
}

/// Credentials for the super-admin account created at startup when absent.
#[derive(Debug, Clone)]
pub struct SuperAdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_access_secret = env::var("JWT_ACCESS_SECRET")
            .map_err(|_| "JWT_ACCESS_SECRET must be set".to_string())?;

        let jwt_refresh_secret = env::var("JWT_REFRESH_SECRET")
            .map_err(|_| "JWT_REFRESH_SECRET must be set".to_string())?;

        if jwt_access_secret == jwt_refresh_secret {
            return Err("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string());
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let super_admin = match (
            env::var("SUPER_ADMIN_EMAIL").ok(),
            env::var("SUPER_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(SuperAdminSeed {
                name: env::var("SUPER_ADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            production,
            jwt_access_secret,
            jwt_refresh_secret,
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 15)?,
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", 7)?,
            upload_dir,
            public_base_url,
            max_image_bytes: parse_or("MAX_IMAGE_BYTES", 5 * 1024 * 1024)?,
            auth_rate_limit_burst: parse_or("AUTH_RATE_LIMIT_BURST", 20)?,
            super_admin,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
