//! Profile Value Object
//!
//! Free-form account metadata attached at sign-up and echoed back by
//! the collaborator on the session's user record. The named fields are
//! the ones the portal collects; anything else the service stores is
//! preserved in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Account profile metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name ("full_name" on the wire)
    #[serde(rename = "full_name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Home institution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Field of study ("field_of_study" on the wire)
    #[serde(rename = "field_of_study", default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,

    /// Any other metadata the collaborator reports
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    pub fn with_field_of_study(mut self, field: impl Into<String>) -> Self {
        self.field_of_study = Some(field.into());
        self
    }

    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.institution.is_none()
            && self.field_of_study.is_none()
            && self.extra.is_empty()
    }
}
