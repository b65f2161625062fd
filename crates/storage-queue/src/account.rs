//! Storage account settings parsed from a connection string.
//!
//! Supported forms:
//! - `DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...;EndpointSuffix=core.windows.net`
//! - `QueueEndpoint=https://...;AccountName=...;AccountKey=...`
//! - `QueueEndpoint=https://...;SharedAccessSignature=sv=...`
//! - `UseDevelopmentStorage=true` (local storage emulator)

use crate::error::ConfigurationError;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::fmt;
use url::Url;
use zeroize::Zeroizing;

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;

/// Account name used by the local storage emulator
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known key of the local storage emulator
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEVELOPMENT_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";

/// Credential used to authorize requests
#[derive(Clone)]
pub enum StorageCredential {
    /// Account key, already base64-decoded
    SharedKey { key: Zeroizing<Vec<u8>> },
    /// Shared access signature query string (without leading `?`)
    SharedAccessSignature { token: Zeroizing<String> },
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey { .. } => write!(f, "SharedKey(<redacted>)"),
            Self::SharedAccessSignature { .. } => write!(f, "SharedAccessSignature(<redacted>)"),
        }
    }
}

/// Everything needed to reach the queue service of one storage account
#[derive(Debug, Clone)]
pub struct StorageAccount {
    account_name: String,
    queue_endpoint: Url,
    credential: StorageCredential,
}

impl StorageAccount {
    /// Parse a storage connection string
    pub fn from_connection_string(connection_string: &str) -> Result<Self, ConfigurationError> {
        let settings = parse_settings(connection_string)?;

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Self::development();
        }

        let account_name = settings.get("accountname").cloned();

        let queue_endpoint = match settings.get("queueendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let name = account_name.as_deref().ok_or_else(|| ConfigurationError::Missing {
                    key: "AccountName".to_string(),
                })?;
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                parse_endpoint(&format!("{}://{}.queue.{}", protocol, name, suffix))?
            }
        };

        let credential = if let Some(key) = settings.get("accountkey") {
            let decoded = STANDARD
                .decode(key)
                .map_err(|e| ConfigurationError::Invalid {
                    message: format!("AccountKey is not valid base64: {}", e),
                })?;
            StorageCredential::SharedKey {
                key: Zeroizing::new(decoded),
            }
        } else if let Some(sas) = settings.get("sharedaccesssignature") {
            StorageCredential::SharedAccessSignature {
                token: Zeroizing::new(sas.trim_start_matches('?').to_string()),
            }
        } else {
            return Err(ConfigurationError::Missing {
                key: "AccountKey or SharedAccessSignature".to_string(),
            });
        };

        // Shared key signing needs the account name even with an explicit endpoint
        let account_name = match (&credential, account_name) {
            (_, Some(name)) => name,
            (StorageCredential::SharedAccessSignature { .. }, None) => queue_endpoint
                .host_str()
                .and_then(|host| host.split('.').next())
                .unwrap_or_default()
                .to_string(),
            (StorageCredential::SharedKey { .. }, None) => {
                return Err(ConfigurationError::Missing {
                    key: "AccountName".to_string(),
                })
            }
        };

        Ok(Self {
            account_name,
            queue_endpoint,
            credential,
        })
    }

    /// Settings for the local storage emulator
    pub fn development() -> Result<Self, ConfigurationError> {
        let key = STANDARD
            .decode(DEVELOPMENT_ACCOUNT_KEY)
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("development key is not valid base64: {}", e),
            })?;

        Ok(Self {
            account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
            queue_endpoint: parse_endpoint(DEVELOPMENT_QUEUE_ENDPOINT)?,
            credential: StorageCredential::SharedKey {
                key: Zeroizing::new(key),
            },
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Queue service endpoint, without a trailing slash
    pub fn queue_endpoint(&self) -> &str {
        self.queue_endpoint.as_str().trim_end_matches('/')
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.credential
    }

    /// True when the endpoint points at the local emulator
    pub fn is_development(&self) -> bool {
        self.account_name == DEVELOPMENT_ACCOUNT_NAME
    }
}

/// Split `key=value;key=value` pairs, lowercasing keys
fn parse_settings(connection_string: &str) -> Result<HashMap<String, String>, ConfigurationError> {
    let mut settings = HashMap::new();

    for part in connection_string.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        // Values (keys, signatures) may themselves contain '='
        let (key, value) = part.split_once('=').ok_or_else(|| ConfigurationError::Parsing {
            message: format!("connection string segment '{}' is not key=value", key_hint(part)),
        })?;

        settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    if settings.is_empty() {
        return Err(ConfigurationError::Missing {
            key: "connection_string".to_string(),
        });
    }

    Ok(settings)
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
        message: format!("invalid queue endpoint '{}': {}", endpoint, e),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigurationError::Invalid {
            message: format!("unsupported endpoint scheme '{}'", other),
        }),
    }
}

/// First few characters of a malformed segment, enough to locate it without leaking secrets
fn key_hint(segment: &str) -> String {
    segment.chars().take(12).collect()
}
