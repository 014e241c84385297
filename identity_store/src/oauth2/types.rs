use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::errors::OAuthAccountError;
use crate::storage::ColumnValue;

/// An external identity provider account linked to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthAccount {
    pub id: String,
    /// Weak back-reference to `User::id`; not enforced by the database
    pub user_id: String,
    pub provider: String,
    /// The provider's own identifier for this identity
    pub provider_account_id: String,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a completed provider-linking flow, ready to be stored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOAuthAccount {
    pub user_id: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl NewOAuthAccount {
    pub fn new(
        user_id: impl Into<String>,
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), OAuthAccountError> {
        for (name, value) in [
            ("userId", &self.user_id),
            ("provider", &self.provider),
            ("providerAccountId", &self.provider_account_id),
        ] {
            if value.trim().is_empty() {
                return Err(OAuthAccountError::Validation(format!("{name} is required")));
            }
        }
        Ok(())
    }
}

/// Token refresh. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl TokenUpdate {
    /// Token columns to write; unset fields are left out
    pub(crate) fn into_columns(self) -> Vec<(&'static str, ColumnValue)> {
        let mut columns: Vec<_> = [
            ("access_token", self.access_token),
            ("refresh_token", self.refresh_token),
            ("token_type", self.token_type),
            ("scope", self.scope),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, ColumnValue::Text(v))))
        .collect();
        if let Some(expires_at) = self.expires_at {
            columns.push(("expires_at", ColumnValue::Timestamp(expires_at)));
        }
        columns
    }
}

/// Search field options for account lookup
#[derive(Debug, Clone)]
pub enum AccountSearchField {
    /// Search by account ID
    Id(String),
    /// Search by the linked user's ID
    UserId(String),
    /// Search by provider name
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_validate_required_fields() {
        assert!(NewOAuthAccount::new("u1", "google", "g-123").validate().is_ok());

        let err = NewOAuthAccount::new("", "google", "g-123").validate().unwrap_err();
        assert!(matches!(err, OAuthAccountError::Validation(msg) if msg.contains("userId")));

        let err = NewOAuthAccount::new("u1", " ", "g-123").validate().unwrap_err();
        assert!(matches!(err, OAuthAccountError::Validation(msg) if msg.contains("provider")));

        let err = NewOAuthAccount::new("u1", "github", "").validate().unwrap_err();
        assert!(
            matches!(err, OAuthAccountError::Validation(msg) if msg.contains("providerAccountId"))
        );
    }

    #[test]
    fn test_account_json_hides_tokens() {
        let now = Utc::now();
        let account = OAuthAccount {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            provider: "github".to_string(),
            provider_account_id: "42".to_string(),
            access_token: Some("gho_secret".to_string()),
            refresh_token: Some("ghr_secret".to_string()),
            expires_at: None,
            token_type: Some("bearer".to_string()),
            scope: Some("read:user".to_string()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"providerAccountId\":\"42\""));
    }

    #[test]
    fn test_token_update_columns_skip_unset_fields() {
        let expires_at = Utc::now();
        let columns = TokenUpdate {
            access_token: Some("new-access".to_string()),
            expires_at: Some(expires_at),
            ..Default::default()
        }
        .into_columns();

        assert_eq!(
            columns,
            vec![
                ("access_token", ColumnValue::Text("new-access".to_string())),
                ("expires_at", ColumnValue::Timestamp(expires_at)),
            ]
        );
        assert!(TokenUpdate::default().into_columns().is_empty());
    }

    #[test]
    fn test_token_update_rejects_identity_fields() {
        let result = serde_json::from_str::<TokenUpdate>(r#"{"userId":"someone-else"}"#);
        assert!(result.is_err());
    }
}
