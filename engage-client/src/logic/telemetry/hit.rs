//! Hit Types
//!
//! Immutable telemetry records reported to the ingestion endpoint.
//! Every hit is validated before it is sent or queued.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::HitError;

// ============================================================================
// EVENT TYPES
// ============================================================================

/// Categories of hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Session start marker
    ActivitySession,
    /// Object was displayed
    Impression,
    /// Object was opened
    Open,
    /// Button or link was clicked
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ActivitySession => "activity_session",
            EventType::Impression => "impression",
            EventType::Open => "open",
            EventType::Click => "click",
        }
    }
}

/// Platform the app runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppSystem {
    Ios,
    Android,
    Web,
}

impl AppSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppSystem::Ios => "ios",
            AppSystem::Android => "android",
            AppSystem::Web => "web",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ios" => Some(AppSystem::Ios),
            "android" => Some(AppSystem::Android),
            "web" => Some(AppSystem::Web),
            _ => None,
        }
    }

    /// Map `std::env::consts::OS` to a platform; anything else is web
    pub fn from_os(os: &str) -> Self {
        match os {
            "ios" => AppSystem::Ios,
            "android" => AppSystem::Android,
            _ => AppSystem::Web,
        }
    }
}

// ============================================================================
// PARAMS & CONTEXT
// ============================================================================

/// Caller-supplied fields of an impression, open or click
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitParams {
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub referrer_code: Option<String>,
    pub target_url: Option<String>,
    pub button_name: Option<String>,
}

impl HitParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params pointing at a domain object, e.g. `("event", "e1")`
    pub fn object(object_type: &str, object_id: &str) -> Self {
        Self {
            object_type: Some(object_type.to_string()),
            object_id: Some(object_id.to_string()),
            ..Default::default()
        }
    }

    // Builder pattern methods
    pub fn with_object_type(mut self, object_type: &str) -> Self {
        self.object_type = Some(object_type.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_utm(mut self, utm_source: &str, utm_campaign: &str) -> Self {
        self.utm_source = Some(utm_source.to_string());
        self.utm_campaign = Some(utm_campaign.to_string());
        self
    }

    pub fn with_referrer_code(mut self, referrer_code: &str) -> Self {
        self.referrer_code = Some(referrer_code.to_string());
        self
    }

    pub fn with_target_url(mut self, target_url: &str) -> Self {
        self.target_url = Some(target_url.to_string());
        self
    }

    pub fn with_button_name(mut self, button_name: &str) -> Self {
        self.button_name = Some(button_name.to_string());
        self
    }
}

/// Per-install fields stamped on every hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitContext {
    /// `{semver}#{build}`
    pub app_version: String,
    pub app_system: AppSystem,
    pub user_agent: Option<String>,
}

// ============================================================================
// HIT (Main struct)
// ============================================================================

/// One telemetry record, as posted to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Hit {
    pub event_type: EventType,

    #[validate(custom(function = "validate_uuid"))]
    pub activity_session_uuid: String,

    /// Local ISO-8601 time with UTC offset
    #[validate(custom(function = "validate_app_date"))]
    pub app_date: String,

    #[validate(custom(function = "validate_app_version"))]
    pub app_version: String,

    pub app_system: AppSystem,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub object_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub object_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub utm_source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub utm_campaign: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub referrer_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Absolute or app-relative; only emptiness is rejected
    #[validate(length(min = 1, max = 2048))]
    pub target_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub button_name: Option<String>,
}

impl Hit {
    /// Build a hit for `event_type` inside the given session
    pub fn new(
        event_type: EventType,
        session_uuid: &str,
        app_date: String,
        context: &HitContext,
        params: HitParams,
    ) -> Self {
        Self {
            event_type,
            activity_session_uuid: session_uuid.to_string(),
            app_date,
            app_version: context.app_version.clone(),
            app_system: context.app_system,
            user_agent: context.user_agent.clone(),
            object_type: params.object_type,
            object_id: params.object_id,
            source: params.source,
            utm_source: params.utm_source,
            utm_campaign: params.utm_campaign,
            referrer_code: params.referrer_code,
            target_url: params.target_url,
            button_name: params.button_name,
        }
    }

    /// Session start marker
    pub fn activity_session(session_uuid: &str, app_date: String, context: &HitContext) -> Self {
        Self::new(
            EventType::ActivitySession,
            session_uuid,
            app_date,
            context,
            HitParams::default(),
        )
    }

    /// Run schema validation, handing the hit back when it passes
    pub fn validated(self) -> Result<Self, HitError> {
        self.validate()?;
        Ok(self)
    }
}

// ============================================================================
// SCHEMA RULES
// ============================================================================

fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid"))
}

fn validate_app_date(value: &str) -> Result<(), ValidationError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("iso8601"))
}

/// `{semver}#{build}` with a numeric build
fn validate_app_version(value: &str) -> Result<(), ValidationError> {
    let (version, build) = value
        .split_once('#')
        .ok_or_else(|| ValidationError::new("app_version_format"))?;

    semver::Version::parse(version).map_err(|_| ValidationError::new("semver"))?;

    if build.is_empty() || !build.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("build_number"));
    }
    Ok(())
}
