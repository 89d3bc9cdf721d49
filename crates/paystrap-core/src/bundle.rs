//! In-memory credential bundle for a single run

use crate::extract::Field;
use paystrap_config::{PaymentSettings, redact};

/// Credentials accumulated as the pipeline progresses
///
/// Fields start unset and are filled once. A value, once set, is kept for
/// the rest of the run.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    account_id: Option<String>,
    publishable_key: Option<String>,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    api_version: String,
}

impl CredentialBundle {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            account_id: None,
            publishable_key: None,
            secret_key: None,
            webhook_secret: None,
            api_version: api_version.into(),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Set a field. Returns `false` and keeps the existing value when the
    /// field was already set.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> bool {
        let slot = self.slot_mut(field);
        if slot.is_some() {
            tracing::warn!(field = %field, "Field already set, keeping first value");
            return false;
        }
        let value = value.into();
        if field.is_secret() {
            tracing::debug!(field = %field, value = %redact(&value), "Field set");
        } else {
            tracing::debug!(field = %field, value = %value, "Field set");
        }
        *slot = Some(value);
        true
    }

    /// Record an extraction result. A miss is logged and left for
    /// verification to report.
    pub fn fill(&mut self, field: Field, value: Option<String>) -> bool {
        match value {
            Some(value) => self.set(field, value),
            None => {
                tracing::warn!(field = %field, "Field not found in platform output");
                false
            }
        }
    }

    /// Required fields that are still unset, in check order
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    pub fn to_payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            account_id: self.account_id.clone(),
            publishable_key: self.publishable_key.clone(),
            secret_key: self.secret_key.clone(),
            webhook_secret: self.webhook_secret.clone(),
            api_version: self.api_version.clone(),
        }
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::AccountId => &self.account_id,
            Field::PublishableKey => &self.publishable_key,
            Field::SecretKey => &self.secret_key,
            Field::WebhookSecret => &self.webhook_secret,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::AccountId => &mut self.account_id,
            Field::PublishableKey => &mut self.publishable_key,
            Field::SecretKey => &mut self.secret_key,
            Field::WebhookSecret => &mut self.webhook_secret,
        }
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("account_id", &self.account_id)
            .field("publishable_key", &self.publishable_key)
            .field("secret_key", &self.secret_key.as_deref().map(redact))
            .field("webhook_secret", &self.webhook_secret.as_deref().map(redact))
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bundle_is_empty() {
        let bundle = CredentialBundle::new("2023-10-16");
        assert_eq!(bundle.api_version(), "2023-10-16");
        assert_eq!(bundle.missing_fields(), Field::REQUIRED.to_vec());
    }

    #[test]
    fn test_field_is_write_once() {
        let mut bundle = CredentialBundle::new("2023-10-16");
        assert!(bundle.set(Field::AccountId, "acct_first"));
        assert!(!bundle.set(Field::AccountId, "acct_second"));
        assert_eq!(bundle.get(Field::AccountId), Some("acct_first"));
    }

    #[test]
    fn test_fill_with_miss_leaves_field_unset() {
        let mut bundle = CredentialBundle::new("2023-10-16");
        assert!(!bundle.fill(Field::SecretKey, None));
        assert!(bundle.fill(Field::PublishableKey, Some("pk_test_abc".into())));
        assert_eq!(bundle.get(Field::SecretKey), None);
        assert_eq!(
            bundle.missing_fields(),
            vec![Field::AccountId, Field::SecretKey, Field::WebhookSecret]
        );
    }

    #[test]
    fn test_to_payment_settings() {
        let mut bundle = CredentialBundle::new("2023-10-16");
        bundle.set(Field::AccountId, "acct_123");
        bundle.set(Field::WebhookSecret, "whsec_999");

        let settings = bundle.to_payment_settings();
        assert_eq!(settings.account_id.as_deref(), Some("acct_123"));
        assert_eq!(settings.publishable_key, None);
        assert_eq!(settings.webhook_secret.as_deref(), Some("whsec_999"));
        assert_eq!(settings.api_version, "2023-10-16");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut bundle = CredentialBundle::new("2023-10-16");
        bundle.set(Field::SecretKey, "sk_test_xyz");
        let rendered = format!("{:?}", bundle);
        assert!(!rendered.contains("sk_test_xyz"));
        assert!(rendered.contains("sk_test_****"));
    }
}
