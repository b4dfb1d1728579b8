//! Runtime configuration, read from the process environment (and `.env`
//! through `dotenv` in `main`).

use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AmadeusConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct ReservationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub amadeus: AmadeusConfig,
    pub stripe: StripeConfig,
    pub smtp: SmtpConfig,
    pub admin_email: String,
    /// `None` disables downstream reservation creation.
    pub reservation: Option<ReservationConfig>,
    pub allowed_origins: Vec<String>,
    pub default_currency: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let smtp_port: u16 = match optional("SMTP_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name: "SMTP_PORT", value: raw })?,
            None => 587,
        };
        let db_max_connections: u32 = match optional("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", value: raw })?,
            None => 10,
        };

        let sender = required("SENDER_EMAIL")?;
        let frontend = optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            db_max_connections,
            jwt_secret: required("JWT_SECRET")?,
            amadeus: AmadeusConfig {
                base_url: optional("AMADEUS_BASE_URL").unwrap_or_else(|| "https://api.amadeus.com".to_string()),
                client_id: required("AMADEUS_KEY")?,
                client_secret: required("AMADEUS_SECRET")?,
            },
            stripe: StripeConfig {
                api_base: optional("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string()),
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                success_url: optional("CHECKOUT_SUCCESS_URL").unwrap_or_else(|| format!("{frontend}/payment/success")),
                cancel_url: optional("CHECKOUT_CANCEL_URL").unwrap_or_else(|| format!("{frontend}/payment/cancel")),
            },
            smtp: SmtpConfig {
                host: required("SMTP_HOST")?,
                port: smtp_port,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                sender: sender.clone(),
            },
            admin_email: optional("ADMIN_EMAIL").unwrap_or(sender),
            reservation: optional("RESERVATION_API_URL").map(|base_url| ReservationConfig {
                base_url,
                api_key: optional("RESERVATION_API_KEY"),
            }),
            allowed_origins: optional("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().trim_end_matches('/').to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            default_currency: optional("DEFAULT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
        })
    }
}
