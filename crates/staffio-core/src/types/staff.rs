//! Staff person records.
//!
//! A staff record is owned by the directory source that holds its
//! distinguished name. Nothing in this workspace caches it.

use serde::{Deserialize, Serialize};

/// Gender as recorded in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Not recorded.
    #[default]
    Unknown,
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Gender {
    /// Short directory attribute value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Male => "m",
            Self::Female => "f",
        }
    }

    /// Parses a directory attribute value. Unrecognised values map to
    /// `Unknown`.
    #[must_use]
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "m" | "male" | "1" => Self::Male,
            "f" | "female" | "2" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person in the staff directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    /// Unique login id.
    pub uid: String,
    /// Distinguished name in the owning source, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    /// Primary email address.
    #[serde(default)]
    pub email: String,
    /// Full display name.
    #[serde(default)]
    pub common_name: String,
    /// Family name.
    #[serde(default)]
    pub surname: String,
    /// Given name.
    #[serde(default)]
    pub given_name: String,
    /// HR employee number.
    #[serde(default)]
    pub employee_number: String,
    /// Employment type or title.
    #[serde(default)]
    pub employee_type: String,
    /// Mobile phone number.
    #[serde(default)]
    pub mobile: String,
    /// Recorded gender.
    #[serde(default)]
    pub gender: Gender,
}

impl Staff {
    /// Name to show in UIs: common name, else given + surname, else uid.
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.common_name.is_empty() {
            return self.common_name.clone();
        }
        let joined = format!("{} {}", self.given_name, self.surname);
        let joined = joined.trim();
        if joined.is_empty() {
            self.uid.clone()
        } else {
            joined.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_attr() {
        assert_eq!(Gender::from_attr("M"), Gender::Male);
        assert_eq!(Gender::from_attr("female"), Gender::Female);
        assert_eq!(Gender::from_attr("2"), Gender::Female);
        assert_eq!(Gender::from_attr("x"), Gender::Unknown);
        assert_eq!(Gender::Male.to_string(), "m");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut staff = Staff {
            uid: "bob".into(),
            ..Default::default()
        };
        assert_eq!(staff.display_name(), "bob");

        staff.surname = "Builder".into();
        staff.given_name = "Bob".into();
        assert_eq!(staff.display_name(), "Bob Builder");

        staff.common_name = "Robert Builder".into();
        assert_eq!(staff.display_name(), "Robert Builder");
    }
}
