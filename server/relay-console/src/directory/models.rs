//! Tenant resources managed through the admin API

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

lazy_static! {
    #[allow(clippy::expect_used)]
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex");
    #[allow(clippy::expect_used)]
    static ref LOCALE: Regex = Regex::new(r"^[a-z]{2}(_[A-Z]{2})?$").expect("valid locale regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// A tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub locale: String,
    pub domain: Option<String>,
    pub support_email: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(regex(path = *LOCALE, message = "Locale must look like en or pt_BR"))]
    #[serde(default = "default_locale")]
    pub locale: String,
    #[validate(length(min = 1, max = 255))]
    pub domain: Option<String>,
    #[validate(email(message = "Support email must be a valid email address"))]
    pub support_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(regex(path = *LOCALE, message = "Locale must look like en or pt_BR"))]
    pub locale: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub domain: Option<String>,
    #[validate(email(message = "Support email must be a valid email address"))]
    pub support_email: Option<String>,
    pub status: Option<AccountStatus>,
}

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    WebWidget,
    Email,
    Api,
    Whatsapp,
    Telegram,
    Facebook,
    Sms,
}

/// A channel through which conversations arrive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Inbox {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub channel_type: ChannelType,
    pub greeting_enabled: bool,
    pub greeting_message: Option<String>,
    pub enable_auto_assignment: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInboxRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub channel_type: ChannelType,
    #[serde(default)]
    pub greeting_enabled: bool,
    #[validate(length(max = 1000))]
    pub greeting_message: Option<String>,
    #[serde(default = "enabled")]
    pub enable_auto_assignment: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInboxRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub greeting_enabled: Option<bool>,
    #[validate(length(max = 1000))]
    pub greeting_message: Option<String>,
    pub enable_auto_assignment: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Administrator,
    #[default]
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Online,
    Busy,
    #[default]
    Offline,
}

/// A member of an account's support staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Agent {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub email: String,
    pub role: AgentRole,
    pub availability: Availability,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAgentRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub role: AgentRole,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAgentRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub role: Option<AgentRole>,
    pub availability: Option<Availability>,
}

/// A group of agents that conversations can be assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub allow_auto_assign: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default = "enabled")]
    pub allow_auto_assign: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub allow_auto_assign: Option<bool>,
}

/// A tag applied to conversations and contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Label {
    pub id: i64,
    pub account_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub color: String,
    pub show_on_sidebar: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLabelRequest {
    #[validate(length(min = 2, max = 255, message = "Title must be between 2 and 255 characters"))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a hex value such as #1F93FF"))]
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "enabled")]
    pub show_on_sidebar: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLabelRequest {
    #[validate(length(min = 2, max = 255, message = "Title must be between 2 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a hex value such as #1F93FF"))]
    pub color: Option<String>,
    pub show_on_sidebar: Option<bool>,
}

fn default_color() -> String {
    "#1F93FF".to_string()
}

fn enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_color_must_be_hex() {
        let request = CreateLabelRequest {
            title: "billing".to_string(),
            description: None,
            color: "blue".to_string(),
            show_on_sidebar: true,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("color"));
    }

    #[test]
    fn test_agent_email_validated() {
        let request = CreateAgentRequest {
            name: "Ana".to_string(),
            email: "not-an-email".to_string(),
            role: AgentRole::Agent,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let request: CreateLabelRequest = serde_json::from_str(r#"{"title": "vip"}"#).unwrap();
        assert_eq!(request.color, "#1F93FF");
        assert!(request.show_on_sidebar);
        assert!(request.validate().is_ok());

        let request: CreateAccountRequest = serde_json::from_str(r#"{"name": "Acme"}"#).unwrap();
        assert_eq!(request.locale, "en");
    }

    #[test]
    fn test_locale_format() {
        let update = UpdateAccountRequest {
            locale: Some("pt_BR".to_string()),
            ..UpdateAccountRequest::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateAccountRequest {
            locale: Some("portuguese".to_string()),
            ..UpdateAccountRequest::default()
        };
        assert!(update.validate().is_err());
    }
}
