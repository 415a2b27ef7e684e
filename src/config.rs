//! Provider configuration: explicit values with environment-variable
//! fallbacks, resolved into a [`ProviderConfig`] or attribute-scoped
//! diagnostics.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::logging::Sensitive;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::is_unknown;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "ADYEN_API_KEY";
/// Environment variable holding the environment (`live` or `test`).
pub const ENV_API_ENVIRONMENT: &str = "ADYEN_API_ENVIRONMENT";
/// Environment variable holding the merchant account id.
pub const ENV_API_MERCHANT_ACCOUNT: &str = "ADYEN_API_MERCHANT_ACCOUNT";
/// Environment variable holding the company account id.
pub const ENV_API_COMPANY_ACCOUNT: &str = "ADYEN_API_COMPANY_ACCOUNT";

const TEST_MANAGEMENT_URL: &str = "https://management-test.adyen.com/v3";
const LIVE_MANAGEMENT_URL: &str = "https://management-live.adyen.com/v3";

/// The Adyen platform the API key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// The test platform.
    #[default]
    Test,
    /// The live platform.
    Live,
}

impl Environment {
    /// Base URL of the Management API v3 for this environment.
    pub fn management_url(&self) -> &'static str {
        match self {
            Self::Test => TEST_MANAGEMENT_URL,
            Self::Live => LIVE_MANAGEMENT_URL,
        }
    }

    /// The lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An environment name other than `live` or `test`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown Adyen API environment '{0}', expected 'live' or 'test'")]
pub struct InvalidEnvironment(pub String);

impl FromStr for Environment {
    type Err = InvalidEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "live" => Ok(Self::Live),
            _ => Err(InvalidEnvironment(s.to_owned())),
        }
    }
}

/// Fully resolved provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// API key sent as `X-API-Key`.
    pub api_key: Sensitive<String>,
    /// Which platform to talk to.
    pub environment: Environment,
    /// Merchant account the merchant-level webhooks belong to.
    pub merchant_account: Sensitive<String>,
    /// Company account the company-level webhooks belong to.
    pub company_account: Sensitive<String>,
}

struct Setting {
    attribute: &'static str,
    label: &'static str,
    env_var: &'static str,
}

const API_KEY: Setting = Setting {
    attribute: "api_key",
    label: "API Key",
    env_var: ENV_API_KEY,
};
const ENVIRONMENT: Setting = Setting {
    attribute: "environment",
    label: "API Environment",
    env_var: ENV_API_ENVIRONMENT,
};
const MERCHANT_ACCOUNT: Setting = Setting {
    attribute: "merchant_account",
    label: "API Merchant Account",
    env_var: ENV_API_MERCHANT_ACCOUNT,
};
const COMPANY_ACCOUNT: Setting = Setting {
    attribute: "company_account",
    label: "API Company Account",
    env_var: ENV_API_COMPANY_ACCOUNT,
};

const SETTINGS: [Setting; 4] = [API_KEY, ENVIRONMENT, MERCHANT_ACCOUNT, COMPANY_ACCOUNT];

/// Schema of the provider configuration block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manages Adyen webhook configuration through the Management API.")
        .with_attribute(
            API_KEY.attribute,
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "The API Key for the Adyen API Client. May also be set with {}.",
                    ENV_API_KEY
                )),
        )
        .with_attribute(
            ENVIRONMENT.attribute,
            Attribute::optional_string().with_description(format!(
                "The environment for the Adyen API Client, either 'live' or 'test'. May also be set with {}.",
                ENV_API_ENVIRONMENT
            )),
        )
        .with_attribute(
            MERCHANT_ACCOUNT.attribute,
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "The Merchant Account ID for the Adyen API Client. May also be set with {}.",
                    ENV_API_MERCHANT_ACCOUNT
                )),
        )
        .with_attribute(
            COMPANY_ACCOUNT.attribute,
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "The Company Account ID for the Adyen API Client. May also be set with {}.",
                    ENV_API_COMPANY_ACCOUNT
                )),
        )
}

/// Resolve the provider settings from explicit configuration and the
/// environment.
///
/// Unknown values are reported first and stop resolution. Otherwise every
/// setting takes its explicit value when one is configured (even an empty
/// one), and the environment variable when not. All empty settings are
/// reported together.
pub fn resolve<F>(config: &Value, env: F) -> Result<ProviderConfig, Vec<Diagnostic>>
where
    F: Fn(&str) -> Option<String>,
{
    let unknown: Vec<Diagnostic> = SETTINGS
        .iter()
        .filter(|s| config.get(s.attribute).is_some_and(is_unknown))
        .map(unknown_diagnostic)
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    let mut diagnostics = Vec::new();
    let api_key = lookup(&API_KEY, config, &env, &mut diagnostics);
    let environment = lookup(&ENVIRONMENT, config, &env, &mut diagnostics);
    let merchant_account = lookup(&MERCHANT_ACCOUNT, config, &env, &mut diagnostics);
    let company_account = lookup(&COMPANY_ACCOUNT, config, &env, &mut diagnostics);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    for (setting, value) in SETTINGS
        .iter()
        .zip([&api_key, &environment, &merchant_account, &company_account])
    {
        if value.is_empty() {
            diagnostics.push(missing_diagnostic(setting));
        }
    }

    let parsed_environment = if environment.is_empty() {
        None
    } else {
        match environment.parse::<Environment>() {
            Ok(env) => Some(env),
            Err(err) => {
                diagnostics.push(invalid_environment_diagnostic(&err));
                None
            },
        }
    };

    match parsed_environment {
        Some(environment) if diagnostics.is_empty() => Ok(ProviderConfig {
            api_key: Sensitive::new(api_key),
            environment,
            merchant_account: Sensitive::new(merchant_account),
            company_account: Sensitive::new(company_account),
        }),
        _ => Err(diagnostics),
    }
}

fn lookup<F>(
    setting: &Setting,
    config: &Value,
    env: &F,
    diagnostics: &mut Vec<Diagnostic>,
) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match config.get(setting.attribute) {
        None | Some(Value::Null) => env(setting.env_var).unwrap_or_default(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            diagnostics.push(
                Diagnostic::error(format!("Invalid Adyen {}", setting.label))
                    .with_detail("The value must be a string.")
                    .with_attribute(setting.attribute),
            );
            String::new()
        },
    }
}

/// Check an explicitly configured environment name without resolving the
/// rest of the configuration.
pub fn validate_environment(config: &Value) -> Vec<Diagnostic> {
    match config.get(ENVIRONMENT.attribute).and_then(Value::as_str) {
        Some(s) if !s.is_empty() && s != crate::types::UNKNOWN_VALUE => match s.parse::<Environment>() {
            Ok(_) => Vec::new(),
            Err(err) => vec![invalid_environment_diagnostic(&err)],
        },
        _ => Vec::new(),
    }
}

fn unknown_diagnostic(setting: &Setting) -> Diagnostic {
    Diagnostic::error(format!("Unknown Adyen {}", setting.label))
        .with_detail(format!(
            "The provider cannot create the Adyen API client as there is an unknown configuration value for the Adyen {}. \
             Either apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
            setting.label, setting.env_var
        ))
        .with_attribute(setting.attribute)
}

fn missing_diagnostic(setting: &Setting) -> Diagnostic {
    Diagnostic::error(format!("Missing Adyen {}", setting.label))
        .with_detail(format!(
            "The provider cannot create the Adyen API client as there is a missing or empty value for the Adyen {}. \
             Set the {} value in the configuration or use the {} environment variable. \
             If either is already set, ensure the value is not empty.",
            setting.label, setting.attribute, setting.env_var
        ))
        .with_attribute(setting.attribute)
}

fn invalid_environment_diagnostic(err: &InvalidEnvironment) -> Diagnostic {
    Diagnostic::error("Invalid Adyen API Environment")
        .with_detail(err.to_string())
        .with_attribute(ENVIRONMENT.attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNKNOWN_VALUE;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn full_config() -> Value {
        json!({
            "api_key": "AQE-explicit",
            "environment": "test",
            "merchant_account": "ExplicitMerchant",
            "company_account": "ExplicitCompany"
        })
    }

    #[test]
    fn environment_parsing() {
        assert_eq!("test".parse::<Environment>(), Ok(Environment::Test));
        assert_eq!("LIVE".parse::<Environment>(), Ok(Environment::Live));
        assert!("staging".parse::<Environment>().is_err());
        assert_eq!(
            Environment::Live.management_url(),
            "https://management-live.adyen.com/v3"
        );
        assert_eq!(
            Environment::Test.management_url(),
            "https://management-test.adyen.com/v3"
        );
    }

    #[test]
    fn explicit_values_resolve() {
        let config = resolve(&full_config(), no_env).unwrap();
        assert_eq!(config.api_key.expose(), "AQE-explicit");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.merchant_account.expose(), "ExplicitMerchant");
        assert_eq!(config.company_account.expose(), "ExplicitCompany");
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let env = env_from(&[
            (ENV_API_KEY, "AQE-from-env"),
            (ENV_API_ENVIRONMENT, "live"),
            (ENV_API_MERCHANT_ACCOUNT, "EnvMerchant"),
            (ENV_API_COMPANY_ACCOUNT, "EnvCompany"),
        ]);

        let config = resolve(&full_config(), env).unwrap();
        assert_eq!(config.api_key.expose(), "AQE-explicit");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.merchant_account.expose(), "ExplicitMerchant");
    }

    #[test]
    fn environment_fills_missing_values() {
        let env = env_from(&[
            (ENV_API_KEY, "AQE-from-env"),
            (ENV_API_ENVIRONMENT, "live"),
            (ENV_API_COMPANY_ACCOUNT, "EnvCompany"),
        ]);

        let config = resolve(
            &json!({"merchant_account": "ExplicitMerchant", "api_key": null}),
            env,
        )
        .unwrap();
        assert_eq!(config.api_key.expose(), "AQE-from-env");
        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.merchant_account.expose(), "ExplicitMerchant");
        assert_eq!(config.company_account.expose(), "EnvCompany");
    }

    #[test]
    fn missing_values_are_reported_together() {
        let diagnostics = resolve(&json!({"environment": "test"}), no_env).unwrap_err();

        let attributes: Vec<_> = diagnostics
            .iter()
            .map(|d| d.attribute.clone().unwrap())
            .collect();
        assert_eq!(
            attributes,
            vec!["api_key", "merchant_account", "company_account"]
        );
        assert_eq!(diagnostics[0].summary, "Missing Adyen API Key");
        assert!(diagnostics[0].detail.as_deref().unwrap().contains(ENV_API_KEY));
    }

    #[test]
    fn explicit_empty_value_is_missing_even_with_env() {
        let env = env_from(&[(ENV_API_KEY, "AQE-from-env")]);
        let mut config = full_config();
        config["api_key"] = json!("");

        let diagnostics = resolve(&config, env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_key"));
    }

    #[test]
    fn unknown_values_stop_resolution() {
        let mut config = full_config();
        config["api_key"] = json!(UNKNOWN_VALUE);
        config["company_account"] = Value::Null;

        let diagnostics = resolve(&config, no_env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Unknown Adyen API Key");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_key"));
    }

    #[test]
    fn invalid_environment_is_reported() {
        let mut config = full_config();
        config["environment"] = json!("staging");

        let diagnostics = resolve(&config, no_env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Adyen API Environment");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("environment"));

        assert_eq!(validate_environment(&config).len(), 1);
        assert!(validate_environment(&full_config()).is_empty());
        assert!(validate_environment(&json!({"environment": UNKNOWN_VALUE})).is_empty());
    }

    #[test]
    fn non_string_value_is_invalid() {
        let mut config = full_config();
        config["merchant_account"] = json!(42);

        let diagnostics = resolve(&config, no_env).unwrap_err();
        assert_eq!(diagnostics[0].summary, "Invalid Adyen API Merchant Account");
    }

    #[test]
    fn secrets_are_masked_in_debug_output() {
        let config = resolve(&full_config(), no_env).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("AQE-explicit"));
        assert!(!printed.contains("ExplicitMerchant"));
        assert!(printed.contains("Test"));
    }

    #[test]
    fn schema_marks_secrets_sensitive() {
        let schema = schema();
        assert!(schema.block.attributes["api_key"].flags.sensitive);
        assert!(!schema.block.attributes["environment"].flags.sensitive);
        assert!(schema.block.attributes["company_account"].flags.optional);
    }
}
