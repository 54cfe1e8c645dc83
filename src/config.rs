//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Airtable REST endpoint.
pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Service configuration for the HTTP binary.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// HTTP listen port.
    pub port: u16,
    /// JSON file holding the business snapshot loaded at startup.
    pub business_file: PathBuf,
    /// Business to run the pipeline against (first in the directory if unset).
    pub business_id: Option<String>,
    /// Customer-ledger credentials (None disables the ledger).
    pub ledger: Option<LedgerConfig>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            business_file: PathBuf::from("./data/business.json"),
            business_id: None,
            ledger: None,
        }
    }
}

impl AssistantConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get("BOOKING_ASSIST_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "BOOKING_ASSIST_PORT".to_string(),
                message: format!("'{raw}': {e}"),
            })?,
            None => defaults.port,
        };

        let business_file = get("BOOKING_ASSIST_BUSINESS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.business_file);

        Ok(Self {
            port,
            business_file,
            business_id: get("BOOKING_ASSIST_BUSINESS_ID"),
            ledger: LedgerConfig::from_lookup(get)?,
        })
    }
}

/// Airtable-backed customer ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub api_url: String,
    pub token: SecretString,
    pub base_id: String,
    pub leads_table: String,
    pub bookings_table: String,
}

impl LedgerConfig {
    /// Ledger section of the config. `None` when neither `AIRTABLE_TOKEN`
    /// nor `AIRTABLE_BASE_ID` is set; an error when only one of them is.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let (token, base_id) = match (get("AIRTABLE_TOKEN"), get("AIRTABLE_BASE_ID")) {
            (None, None) => return Ok(None),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("AIRTABLE_BASE_ID".into())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("AIRTABLE_TOKEN".into())),
            (Some(token), Some(base_id)) => (token, base_id),
        };

        let api_url = get("AIRTABLE_API_URL").unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string());
        let leads_table = get("AIRTABLE_LEADS_TABLE").unwrap_or_else(|| "Leads".to_string());
        let bookings_table =
            get("AIRTABLE_BOOKINGS_TABLE").unwrap_or_else(|| "Bookings".to_string());

        Ok(Some(
            Self::new(api_url, SecretString::from(token), base_id)
                .with_tables(leads_table, bookings_table),
        ))
    }

    /// Config with default table names.
    pub fn new(api_url: impl Into<String>, token: SecretString, base_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            base_id: base_id.into(),
            leads_table: "Leads".to_string(),
            bookings_table: "Bookings".to_string(),
        }
    }

    /// Override the lead and booking table names.
    pub fn with_tables(mut self, leads: impl Into<String>, bookings: impl Into<String>) -> Self {
        self.leads_table = leads.into();
        self.bookings_table = bookings.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AssistantConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.ledger.is_none());
    }

    #[test]
    fn reads_all_values() {
        let config = AssistantConfig::from_lookup(lookup(&[
            ("BOOKING_ASSIST_PORT", "9090"),
            ("BOOKING_ASSIST_BUSINESS_FILE", "/etc/shop.json"),
            ("BOOKING_ASSIST_BUSINESS_ID", " shop-1 "),
            ("AIRTABLE_TOKEN", "pat123"),
            ("AIRTABLE_BASE_ID", "appXYZ"),
            ("AIRTABLE_LEADS_TABLE", "Prospects"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.business_file, PathBuf::from("/etc/shop.json"));
        assert_eq!(config.business_id.as_deref(), Some("shop-1"));

        let ledger = config.ledger.unwrap();
        assert_eq!(ledger.token.expose_secret(), "pat123");
        assert_eq!(ledger.base_id, "appXYZ");
        assert_eq!(ledger.api_url, DEFAULT_AIRTABLE_API_URL);
        assert_eq!(ledger.leads_table, "Prospects");
        assert_eq!(ledger.bookings_table, "Bookings");
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = AssistantConfig::from_lookup(lookup(&[("BOOKING_ASSIST_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BOOKING_ASSIST_PORT"));
    }

    #[test]
    fn half_configured_ledger_is_an_error() {
        let err = AssistantConfig::from_lookup(lookup(&[("AIRTABLE_TOKEN", "pat123")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "AIRTABLE_BASE_ID"));

        let err = AssistantConfig::from_lookup(lookup(&[("AIRTABLE_BASE_ID", "app")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "AIRTABLE_TOKEN"));
    }

    #[test]
    fn default_config_values() {
        let config = AssistantConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.business_file, PathBuf::from("./data/business.json"));
        assert!(config.business_id.is_none());
        assert!(config.ledger.is_none());
    }

    #[test]
    fn ledger_config_trims_trailing_slash() {
        let config = LedgerConfig::new(
            "http://localhost:9000/v0/",
            SecretString::from("tok"),
            "app123",
        );
        assert_eq!(config.api_url, "http://localhost:9000/v0");
        assert_eq!(config.leads_table, "Leads");
        assert_eq!(config.bookings_table, "Bookings");
    }

    #[test]
    fn ledger_config_custom_tables() {
        let config = LedgerConfig::new(DEFAULT_AIRTABLE_API_URL, SecretString::from("t"), "b")
            .with_tables("Prospects", "Appointments");
        assert_eq!(config.leads_table, "Prospects");
        assert_eq!(config.bookings_table, "Appointments");
    }
}
