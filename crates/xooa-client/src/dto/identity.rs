use {
    serde::{Deserialize, Serialize},
    serde_with::{DefaultOnNull, serde_as},
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
};

/// An API-credentialed principal known to the gateway.
///
/// Listing identities only returns the name, the management flag, the
/// creation date and the id; every other field is empty in that case.
#[serde_as]
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "IdentityName", default)]
    pub identity_name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Access", default)]
    pub access: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "canManageIdentities", default)]
    pub can_manage_identities: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ApiToken", default)]
    pub api_token: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Attrs", default)]
    pub attributes: Vec<Attribute>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("identity_name", &self.identity_name)
            .field("access", &self.access)
            .field("can_manage_identities", &self.can_manage_identities)
            .field("created_at", &self.created_at)
            .field("api_token", &"SECRET")
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// A certificate attribute attached to an identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    /// Whether the attribute is embedded in the enrollment certificate.
    #[serde(default)]
    pub ecert: bool,
}

/// Ledger access granted to an identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Access {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Display for Access {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "rw",
        })
    }
}

impl FromStr for Access {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "rw" => Ok(Self::ReadWrite),
            _ => anyhow::bail!("unknown access level {s:?}, expected one of r, w, rw"),
        }
    }
}

/// Enrollment request for a new identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdentityRequest {
    #[serde(rename = "IdentityName")]
    pub identity_name: String,
    #[serde(rename = "access")]
    pub access: Access,
    #[serde(rename = "canManageIdentities")]
    pub can_manage_identities: bool,
    #[serde(rename = "Attrs")]
    pub attributes: Vec<Attribute>,
}
