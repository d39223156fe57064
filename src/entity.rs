use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

/// Reserved sender id for messages authored by the engine itself.
pub const SYSTEM_SENDER: &str = "system";

/// Which account store a user was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOrigin {
    Staff,
    Learner,
    Intern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    Adviser,
    Learner,
    Intern,
}

impl AccountOrigin {
    pub const ALL: [AccountOrigin; 3] = [Self::Staff, Self::Learner, Self::Intern];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Learner => "learner",
            Self::Intern => "intern",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Staff => Role::Adviser,
            Self::Learner => Role::Learner,
            Self::Intern => Role::Intern,
        }
    }
}

impl fmt::Display for AccountOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountOrigin {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(Self::Staff),
            "learner" => Ok(Self::Learner),
            "intern" => Ok(Self::Intern),
            other => Err(ChatError::invalid(format!("unknown account origin: {}", other))),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Adviser => "adviser",
            Self::Learner => "learner",
            Self::Intern => "intern",
        }
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "adviser" => Ok(Self::Adviser),
            "learner" => Ok(Self::Learner),
            "intern" => Ok(Self::Intern),
            other => Err(ChatError::invalid(format!("unknown role: {}", other))),
        }
    }
}

/// A row in one of the external account stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub photo: Option<String>,
}

/// A resolved participant, tagged with the store it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub photo: Option<String>,
    pub origin: AccountOrigin,
}

impl UserProfile {
    pub fn from_account(account: Account, origin: AccountOrigin) -> Self {
        Self {
            id: account.id,
            display_name: account.display_name,
            photo: account.photo,
            origin,
        }
    }

    pub fn role(&self) -> Role {
        self.origin.role()
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Sender identity frozen onto a message at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSnapshot {
    pub name: String,
    pub photo: Option<String>,
    pub role: Option<Role>,
}

impl SenderSnapshot {
    pub fn system() -> Self {
        Self {
            name: "System".to_string(),
            photo: None,
            role: Some(Role::System),
        }
    }

    /// Stand-in for an id the directory could not resolve.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown user".to_string(),
            photo: None,
            role: None,
        }
    }
}

impl From<&UserProfile> for SenderSnapshot {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.display_name.clone(),
            photo: profile.photo.clone(),
            role: Some(profile.role()),
        }
    }
}

/// A chat member as shown in a membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    pub profile: Option<UserProfile>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .map(|p| p.display_name.as_str())
            .unwrap_or("Unknown user")
    }
}
