#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

const MAX_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdError {
    Empty,
    TooLong,
    ContainsControl,
    ContainsSeparator,
}

impl IdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "identifier must not be empty",
            Self::TooLong => "identifier is too long",
            Self::ContainsControl => "identifier contains control characters",
            Self::ContainsSeparator => "identifier must not contain ':'",
        }
    }
}

impl std::fmt::Display for IdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for IdError {}

fn validate_identifier(value: &str) -> Result<String, IdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(IdError::ContainsControl);
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerritoryId(String);

impl TerritoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        validate_identifier(&value.into()).map(Self)
    }
}

/// Opaque reference to a congregation member, issued by the identity provider.
///
/// Existence is never checked here; the only rule is that the id is non-empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        validate_identifier(&value.into()).map(Self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleId(String);

impl ScheduleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        validate_identifier(&value.into()).map(Self)
    }
}

/// Stable identity of a part slot inside a schedule, independent of its display name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartId(String);

impl PartId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = validate_identifier(&value.into())?;
        if value.contains(':') {
            return Err(IdError::ContainsSeparator);
        }
        Ok(Self(value))
    }

    pub fn for_ordinal(ordinal: usize) -> Self {
        Self(format!("p{ordinal}"))
    }
}

macro_rules! string_conversions {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = IdError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::try_new(value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

string_conversions!(TerritoryId, MemberId, ScheduleId, PartId);
