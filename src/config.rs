// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `COGNITO_REGION` | User pool region (falls back to `AWS_REGION`) | `us-east-1` |
//! | `COGNITO_USER_POOL_ID` | User pool ID | Required |
//! | `COGNITO_CLIENT_ID` | App client ID | Required |
//! | `COGNITO_CLIENT_SECRET` | App client secret | Required |
//! | `COGNITO_JWKS_URL` | HTTPS override for the pool's JWKS endpoint | Derived from region and pool |
//! | `SIGNING_REGION` | Region expected in signed-request scopes | Cognito region |
//! | `SIGNING_SERVICE` | Service expected in signed-request scopes | `execute-api` |
//! | `SIGNING_CREDENTIALS` | `AKID:secret` pairs separated by `,` | Empty (signed routes reject all) |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::{cognito_issuer, CredentialStore};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const COGNITO_REGION_ENV: &str = "COGNITO_REGION";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const USER_POOL_ID_ENV: &str = "COGNITO_USER_POOL_ID";
pub const CLIENT_ID_ENV: &str = "COGNITO_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "COGNITO_CLIENT_SECRET";
pub const JWKS_URL_ENV: &str = "COGNITO_JWKS_URL";
pub const SIGNING_REGION_ENV: &str = "SIGNING_REGION";
pub const SIGNING_SERVICE_ENV: &str = "SIGNING_SERVICE";
pub const SIGNING_CREDENTIALS_ENV: &str = "SIGNING_CREDENTIALS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SIGNING_SERVICE: &str = "execute-api";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Cognito user pool settings.
#[derive(Clone)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub jwks_url_override: Option<String>,
}

impl CognitoConfig {
    /// Expected `iss` claim of the pool's access tokens.
    pub fn issuer(&self) -> String {
        cognito_issuer(&self.region, &self.user_pool_id)
    }

    /// The pool's JWKS endpoint, unless overridden.
    pub fn jwks_url(&self) -> String {
        self.jwks_url_override
            .clone()
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", self.issuer()))
    }
}

impl fmt::Debug for CognitoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CognitoConfig")
            .field("region", &self.region)
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("jwks_url_override", &self.jwks_url_override)
            .finish_non_exhaustive()
    }
}

/// Signed-request settings.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub region: String,
    pub service: String,
    pub credentials: CredentialStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cognito: CognitoConfig,
    pub signing: SigningConfig,
    pub tls: Option<TlsConfig>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                reason: format!("{raw:?} is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let region = get(COGNITO_REGION_ENV)
            .or_else(|| get(AWS_REGION_ENV))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let jwks_url_override = get(JWKS_URL_ENV).map(validate_jwks_url).transpose()?;

        let cognito = CognitoConfig {
            user_pool_id: require(USER_POOL_ID_ENV)?,
            client_id: require(CLIENT_ID_ENV)?,
            client_secret: require(CLIENT_SECRET_ENV)?,
            region: region.clone(),
            jwks_url_override,
        };

        let signing = SigningConfig {
            region: get(SIGNING_REGION_ENV).unwrap_or(region),
            service: get(SIGNING_SERVICE_ENV).unwrap_or_else(|| DEFAULT_SIGNING_SERVICE.to_string()),
            credentials: parse_credentials(get(SIGNING_CREDENTIALS_ENV).as_deref().unwrap_or(""))?,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected json or pretty, got {other:?}"),
                })
            }
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cognito,
            signing,
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })
    }
}

fn validate_jwks_url(raw: String) -> Result<String, ConfigError> {
    let url = url::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        var: JWKS_URL_ENV,
        reason: e.to_string(),
    })?;
    if url.scheme() != "https" {
        return Err(ConfigError::Invalid {
            var: JWKS_URL_ENV,
            reason: "JWKS must be fetched over https".to_string(),
        });
    }
    Ok(raw)
}

/// Parse `AKID:secret,AKID2:secret2`.
fn parse_credentials(raw: &str) -> Result<CredentialStore, ConfigError> {
    let mut store = CredentialStore::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once(':') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
                store.insert(id, secret);
            }
            _ => {
                return Err(ConfigError::Invalid {
                    var: SIGNING_CREDENTIALS_ENV,
                    reason: "expected ACCESS_KEY_ID:SECRET pairs".to_string(),
                })
            }
        }
    }
    Ok(store)
}
