use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApproverId(pub String);

impl fmt::Display for ApproverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Staff role. Credit sub-roles are score banded and keep their full storage
/// name (`Credit_1`, `CreditJunior`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    Ops,
    SeniorOps,
    Credit(String),
    SeniorCredit,
    Finance,
    Disbursal,
}

/// Role family without the credit sub-role name, used as the key of the
/// transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Ops,
    SeniorOps,
    Credit,
    SeniorCredit,
    Finance,
    Disbursal,
}

impl RoleKind {
    pub const ALL: [RoleKind; 6] = [
        RoleKind::Ops,
        RoleKind::SeniorOps,
        RoleKind::Credit,
        RoleKind::SeniorCredit,
        RoleKind::Finance,
        RoleKind::Disbursal,
    ];
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ops => "Ops",
            Self::SeniorOps => "Senior_Ops",
            Self::Credit(name) => name.as_str(),
            Self::SeniorCredit => "Senior_Credit",
            Self::Finance => "Finance",
            Self::Disbursal => "Disbursal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value {
            "Ops" => Some(Self::Ops),
            "Senior_Ops" => Some(Self::SeniorOps),
            "Senior_Credit" => Some(Self::SeniorCredit),
            "Finance" => Some(Self::Finance),
            "Disbursal" => Some(Self::Disbursal),
            credit if credit.starts_with("Credit") => Some(Self::Credit(credit.to_owned())),
            _ => None,
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Ops => RoleKind::Ops,
            Self::SeniorOps => RoleKind::SeniorOps,
            Self::Credit(_) => RoleKind::Credit,
            Self::SeniorCredit => RoleKind::SeniorCredit,
            Self::Finance => RoleKind::Finance,
            Self::Disbursal => RoleKind::Disbursal,
        }
    }

    /// True for the credit sub-roles and Senior_Credit, the targets of an
    /// intra-credit reassignment.
    pub fn is_credit_level(&self) -> bool {
        matches!(self, Self::Credit(_) | Self::SeniorCredit)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| format!("unknown role `{value}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverStatus {
    Active,
    Suspended,
    Deleted,
}

impl ApproverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "SUSPENDED" => Some(Self::Suspended),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ApproverId,
    pub name: String,
    pub role: Role,
    pub status: ApproverStatus,
    pub created_at: DateTime<Utc>,
}

impl Approver {
    pub fn is_eligible(&self) -> bool {
        self.status == ApproverStatus::Active
    }
}

/// Current number of open applications held by one approver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverLoad {
    pub approver: Approver,
    pub open_applications: u32,
}
