use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::errors::UserError;
use crate::storage::ColumnValue;

/// Organizational role of the person behind an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "CEO")]
    Ceo,
    #[serde(rename = "CFO")]
    Cfo,
    #[serde(rename = "COO")]
    Coo,
    #[serde(rename = "CMO")]
    Cmo,
    #[serde(rename = "CTO")]
    Cto,
    #[serde(rename = "Board Member")]
    BoardMember,
    #[serde(rename = "Department Head")]
    DepartmentHead,
    Investor,
    Founder,
    Other,
}

impl UserRole {
    pub const ALL: [UserRole; 10] = [
        Self::Ceo,
        Self::Cfo,
        Self::Coo,
        Self::Cmo,
        Self::Cto,
        Self::BoardMember,
        Self::DepartmentHead,
        Self::Investor,
        Self::Founder,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ceo => "CEO",
            Self::Cfo => "CFO",
            Self::Coo => "COO",
            Self::Cmo => "CMO",
            Self::Cto => "CTO",
            Self::BoardMember => "Board Member",
            Self::DepartmentHead => "Department Head",
            Self::Investor => "Investor",
            Self::Founder => "Founder",
            Self::Other => "Other",
        }
    }
}

impl FromStr for UserRole {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UserError::Validation(format!("'{s}' is not a valid role")))
    }
}

/// Head-count bracket of the user's company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-500")]
    Large,
    #[serde(rename = "501-1000")]
    XLarge,
    #[serde(rename = "1000+")]
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 6] = [
        Self::Micro,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::XLarge,
        Self::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Micro => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::Large => "201-500",
            Self::XLarge => "501-1000",
            Self::Enterprise => "1000+",
        }
    }
}

impl FromStr for CompanySize {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| UserError::Validation(format!("'{s}' is not a valid company size")))
    }
}

/// Business area the user wants help with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BusinessGoal {
    Strategy,
    Finance,
    Operations,
    Marketing,
    Technology,
    #[serde(rename = "R&D")]
    ResearchAndDevelopment,
    Sales,
    #[serde(rename = "HR")]
    HumanResources,
}

impl BusinessGoal {
    pub const ALL: [BusinessGoal; 8] = [
        Self::Strategy,
        Self::Finance,
        Self::Operations,
        Self::Marketing,
        Self::Technology,
        Self::ResearchAndDevelopment,
        Self::Sales,
        Self::HumanResources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategy => "Strategy",
            Self::Finance => "Finance",
            Self::Operations => "Operations",
            Self::Marketing => "Marketing",
            Self::Technology => "Technology",
            Self::ResearchAndDevelopment => "R&D",
            Self::Sales => "Sales",
            Self::HumanResources => "HR",
        }
    }
}

impl FromStr for BusinessGoal {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|goal| goal.as_str() == s)
            .ok_or_else(|| UserError::Validation(format!("'{s}' is not a valid goal")))
    }
}

/// A stored user identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Storage-assigned identifier, never changes
    pub id: String,
    /// Unique across all users, compared case-sensitively
    pub email: String,
    /// bcrypt hash, `None` for accounts that only sign in through a provider.
    /// Never serialized, so it cannot leak through an API response.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Option<UserRole>,
    pub company_name: Option<String>,
    pub company_size: Option<CompanySize>,
    pub industry: Option<String>,
    #[serde(default)]
    pub goals: BTreeSet<BusinessGoal>,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup form as received from the client.
///
/// `confirm_password` and `is_active` are accepted so a raw form body
/// deserializes, but neither is ever stored.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub goals: BTreeSet<BusinessGoal>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub github_id: Option<String>,
}

impl SignupData {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON signup body; unknown enum labels become `UserError::Validation`
    pub fn from_json(body: &str) -> Result<Self, UserError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Presence checks for the required fields
    pub fn validate(&self) -> Result<(), UserError> {
        if self.email.trim().is_empty() {
            return Err(UserError::Validation("email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(UserError::Validation("password is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for SignupData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("company_name", &self.company_name)
            .field("company_size", &self.company_size)
            .field("goals", &self.goals)
            .finish_non_exhaustive()
    }
}

/// Partial update of a user. `None` leaves the stored value untouched.
///
/// `id` and the timestamps are not part of the shape, so a body that tries
/// to set them is rejected by [`UserUpdate::from_json`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    pub email: Option<String>,
    /// Plaintext; hashed by the store before it is written
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Option<UserRole>,
    pub company_name: Option<String>,
    pub company_size: Option<CompanySize>,
    pub industry: Option<String>,
    pub goals: Option<BTreeSet<BusinessGoal>>,
    pub is_active: Option<bool>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
}

impl UserUpdate {
    pub fn from_json(body: &str) -> Result<Self, UserError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn validate(&self) -> Result<(), UserError> {
        if let Some(email) = &self.email {
            if email.trim().is_empty() {
                return Err(UserError::Validation("email cannot be empty".to_string()));
            }
        }
        if self.password.as_deref() == Some("") {
            return Err(UserError::Validation("password cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Columns to write for this update, with `password_hash` in place of the plaintext.
    ///
    /// Fields left as `None` are absent, so the stored values stay untouched.
    pub(crate) fn into_columns(
        self,
        password_hash: Option<String>,
    ) -> Result<Vec<(&'static str, ColumnValue)>, UserError> {
        let Self {
            email,
            password: _,
            first_name,
            last_name,
            profile_image_url,
            role,
            company_name,
            company_size,
            industry,
            goals,
            is_active,
            google_id,
            github_id,
        } = self;

        let text = [
            ("email", email),
            ("password", password_hash),
            ("first_name", first_name),
            ("last_name", last_name),
            ("profile_image_url", profile_image_url),
            ("role", role.map(|r| r.as_str().to_string())),
            ("company_name", company_name),
            ("company_size", company_size.map(|s| s.as_str().to_string())),
            ("industry", industry),
            ("goals", goals.as_ref().map(goals_to_json).transpose()?),
            ("google_id", google_id),
            ("github_id", github_id),
        ];

        let mut columns: Vec<_> = text
            .into_iter()
            .filter_map(|(column, value)| value.map(|v| (column, ColumnValue::Text(v))))
            .collect();
        if let Some(active) = is_active {
            columns.push(("is_active", ColumnValue::Bool(active)));
        }
        Ok(columns)
    }
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserUpdate")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("company_size", &self.company_size)
            .field("goals", &self.goals)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Search field options for user lookup
#[derive(Debug, Clone)]
pub(crate) enum UserSearchField {
    Id(String),
    Email(String),
}

impl fmt::Display for UserSearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Emails are personal data, keep them out of spans
        match self {
            Self::Id(id) => write!(f, "Id({id})"),
            Self::Email(_) => write!(f, "Email(..)"),
        }
    }
}

/// Row as stored: enum columns are labels, `goals` is a JSON array
#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    id: String,
    email: String,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    role: Option<String>,
    company_name: Option<String>,
    company_size: Option<String>,
    industry: Option<String>,
    goals: String,
    is_active: bool,
    google_id: Option<String>,
    github_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let corrupt = |e: UserError| UserError::Storage(format!("corrupt user row {}: {e}", row.id));

        let role = row
            .role
            .as_deref()
            .map(str::parse::<UserRole>)
            .transpose()
            .map_err(corrupt)?;
        let company_size = row
            .company_size
            .as_deref()
            .map(str::parse::<CompanySize>)
            .transpose()
            .map_err(corrupt)?;
        let goals: BTreeSet<BusinessGoal> = serde_json::from_str(&row.goals)
            .map_err(|e| corrupt(UserError::Validation(e.to_string())))?;

        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_image_url: row.profile_image_url,
            role,
            company_name: row.company_name,
            company_size,
            industry: row.industry,
            goals,
            is_active: row.is_active,
            google_id: row.google_id,
            github_id: row.github_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Serialize the goal set for the `goals` column
pub(super) fn goals_to_json(goals: &BTreeSet<BusinessGoal>) -> Result<String, UserError> {
    serde_json::to_string(goals).map_err(|e| UserError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: "user-1".to_string(),
            email: "a@x.com".to_string(),
            password: Some("$2b$12$hash".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            profile_image_url: None,
            role: Some(UserRole::Founder),
            company_name: Some("Engines".to_string()),
            company_size: Some(CompanySize::Micro),
            industry: None,
            goals: BTreeSet::from([BusinessGoal::Strategy]),
            is_active: true,
            google_id: None,
            github_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_labels_parse() {
        assert_eq!("Board Member".parse::<UserRole>().unwrap(), UserRole::BoardMember);
        assert_eq!("CEO".parse::<UserRole>().unwrap(), UserRole::Ceo);
        assert!(matches!("ceo".parse::<UserRole>(), Err(UserError::Validation(_))));
        assert!(matches!("King".parse::<UserRole>(), Err(UserError::Validation(_))));
    }

    #[test]
    fn test_company_size_and_goal_labels_parse() {
        assert_eq!("1000+".parse::<CompanySize>().unwrap(), CompanySize::Enterprise);
        assert_eq!(
            "R&D".parse::<BusinessGoal>().unwrap(),
            BusinessGoal::ResearchAndDevelopment
        );
        assert!(matches!("5000+".parse::<CompanySize>(), Err(UserError::Validation(_))));
        assert!(matches!("Legal".parse::<BusinessGoal>(), Err(UserError::Validation(_))));
    }

    #[test]
    fn test_serde_labels_match_as_str() {
        for role in UserRole::ALL {
            assert_eq!(serde_json::to_value(role).unwrap(), role.as_str());
        }
        for size in CompanySize::ALL {
            assert_eq!(serde_json::to_value(size).unwrap(), size.as_str());
        }
        for goal in BusinessGoal::ALL {
            assert_eq!(serde_json::to_value(goal).unwrap(), goal.as_str());
        }
    }

    #[test]
    fn test_user_json_hides_password_and_uses_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("password").is_none(), "hash must not be serialized");
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["companySize"], "1-10");
        assert_eq!(json["goals"], serde_json::json!(["Strategy"]));
    }

    #[test]
    fn test_signup_from_json_rejects_out_of_set_role() {
        let body = r#"{"email":"a@x.com","password":"secret1","role":"King"}"#;
        assert!(matches!(SignupData::from_json(body), Err(UserError::Validation(_))));
    }

    #[test]
    fn test_signup_from_json_rejects_out_of_set_goal() {
        let body = r#"{"email":"a@x.com","password":"secret1","goals":["Strategy","Legal"]}"#;
        assert!(matches!(SignupData::from_json(body), Err(UserError::Validation(_))));
    }

    #[test]
    fn test_signup_from_json_accepts_full_form() {
        let body = r#"{
            "email": "a@x.com",
            "password": "secret1",
            "confirmPassword": "secret1",
            "firstName": "Ada",
            "role": "Department Head",
            "companySize": "201-500",
            "goals": ["HR", "R&D", "HR"],
            "isActive": false
        }"#;
        let signup = SignupData::from_json(body).expect("valid signup body");

        assert_eq!(signup.confirm_password.as_deref(), Some("secret1"));
        assert_eq!(signup.role, Some(UserRole::DepartmentHead));
        assert_eq!(signup.company_size, Some(CompanySize::Large));
        assert_eq!(signup.goals.len(), 2, "goals is a set");
        assert!(signup.validate().is_ok());
    }

    #[test]
    fn test_signup_validate_required_fields() {
        assert!(matches!(
            SignupData::new("  ", "secret1").validate(),
            Err(UserError::Validation(msg)) if msg.contains("email")
        ));
        assert!(matches!(
            SignupData::new("a@x.com", "").validate(),
            Err(UserError::Validation(msg)) if msg.contains("password")
        ));
    }

    #[test]
    fn test_signup_debug_redacts_password() {
        let mut signup = SignupData::new("a@x.com", "secret1");
        signup.confirm_password = Some("secret1".to_string());

        let debug = format!("{signup:?}");
        assert!(!debug.contains("secret1"));
        assert!(debug.contains("a@x.com"));
    }

    #[test]
    fn test_update_rejects_immutable_fields() {
        assert!(matches!(
            UserUpdate::from_json(r#"{"id":"other"}"#),
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            UserUpdate::from_json(r#"{"createdAt":"2020-01-01T00:00:00Z"}"#),
            Err(UserError::Validation(_))
        ));
    }

    #[test]
    fn test_update_columns_only_cover_set_fields() {
        let update = UserUpdate {
            last_name: Some("Byron".to_string()),
            role: Some(UserRole::Cto),
            goals: Some(BTreeSet::from([BusinessGoal::Sales, BusinessGoal::Finance])),
            is_active: Some(false),
            password: Some("plaintext".to_string()),
            ..Default::default()
        };
        let columns = update.into_columns(Some("$2b$12$hash".to_string())).unwrap();

        assert_eq!(
            columns,
            vec![
                ("password", ColumnValue::Text("$2b$12$hash".to_string())),
                ("last_name", ColumnValue::Text("Byron".to_string())),
                ("role", ColumnValue::Text("CTO".to_string())),
                ("goals", ColumnValue::Text(r#"["Finance","Sales"]"#.to_string())),
                ("is_active", ColumnValue::Bool(false)),
            ]
        );

        let empty = UserUpdate::default().into_columns(None).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_update_validate() {
        let update = UserUpdate {
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(UserError::Validation(_))));

        let update = UserUpdate {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(UserError::Validation(_))));
    }

    #[test]
    fn test_search_field_display_hides_email() {
        assert_eq!(UserSearchField::Id("u1".to_string()).to_string(), "Id(u1)");
        assert_eq!(
            UserSearchField::Email("a@x.com".to_string()).to_string(),
            "Email(..)"
        );
    }

    proptest! {
        /// Any string outside the label set is rejected, any label parses back to itself
        #[test]
        fn test_role_parse_matches_label_set(s in "[A-Za-z ]{0,20}") {
            let is_label = UserRole::ALL.iter().any(|r| r.as_str() == s);
            prop_assert_eq!(s.parse::<UserRole>().is_ok(), is_label);
        }

        #[test]
        fn test_goal_label_roundtrip(idx in 0usize..BusinessGoal::ALL.len()) {
            let goal = BusinessGoal::ALL[idx];
            prop_assert_eq!(goal.as_str().parse::<BusinessGoal>().unwrap(), goal);
        }
    }
}
