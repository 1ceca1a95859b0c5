//! Core request and response types shared by the CLI and the stack client.
//!
//! Stack lifecycle state is owned entirely by the remote provisioning
//! service; these types only describe requests and what the service reports
//! back.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Provider regions accepted by the provisioning service.
///
/// The wire form (`us-east-1`, ...) is the single source of truth; clap and
/// serde both use it so config files and CLI flags stay interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
pub enum Region {
    #[value(name = "us-east-1")]
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[value(name = "us-west-2")]
    #[serde(rename = "us-west-2")]
    UsWest2,
    #[value(name = "eu-west-1")]
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[value(name = "eu-central-1")]
    #[serde(rename = "eu-central-1")]
    EuCentral1,
    #[value(name = "ap-southeast-1")]
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
}

impl Region {
    pub fn as_wire(self) -> &'static str {
        match self {
            Region::UsEast1 => "us-east-1",
            Region::UsWest2 => "us-west-2",
            Region::EuWest1 => "eu-west-1",
            Region::EuCentral1 => "eu-central-1",
            Region::ApSoutheast1 => "ap-southeast-1",
        }
    }

    /// Parse the wire form, e.g. from the `STACKCTL_REGION` environment variable.
    pub fn parse_wire(raw: &str) -> Option<Region> {
        [
            Region::UsEast1,
            Region::UsWest2,
            Region::EuWest1,
            Region::EuCentral1,
            Region::ApSoutheast1,
        ]
        .into_iter()
        .find(|region| region.as_wire() == raw)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Escalations the service requires before provisioning privileged resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,
}

impl Capability {
    pub fn as_wire(self) -> &'static str {
        match self {
            Capability::NamedIam => "CAPABILITY_NAMED_IAM",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One `(key, value)` entry from the parameter document, order preserved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

/// Everything a create or update call sends to the provisioning service.
#[derive(Clone, Debug, Serialize)]
pub struct StackRequest {
    pub stack_name: String,
    pub region: Region,
    pub template_body: String,
    pub parameters: Vec<Parameter>,
    pub capabilities: BTreeSet<Capability>,
}

/// Opaque identifier the service assigns on create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(pub String);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote lifecycle state, only ever observed in describe responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    Creating,
    Available,
    Updating,
    Failed,
    Deleting,
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StackStatus::Creating => "CREATING",
            StackStatus::Available => "AVAILABLE",
            StackStatus::Updating => "UPDATING",
            StackStatus::Failed => "FAILED",
            StackStatus::Deleting => "DELETING",
        };
        f.write_str(label)
    }
}

/// What the service reports for an existing stack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StackDescription {
    pub stack_id: StackId,
    pub stack_name: String,
    pub status: StackStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_wire_form_round_trips() {
        for region in [
            Region::UsEast1,
            Region::UsWest2,
            Region::EuWest1,
            Region::EuCentral1,
            Region::ApSoutheast1,
        ] {
            assert_eq!(Region::parse_wire(region.as_wire()), Some(region));
        }
        assert_eq!(Region::parse_wire("mars-north-1"), None);
    }

    #[test]
    fn region_serde_uses_wire_form() {
        let json = serde_json::to_string(&Region::EuCentral1).expect("serialize region");
        assert_eq!(json, "\"eu-central-1\"");
        let parsed: Region = serde_json::from_str("\"us-west-2\"").expect("parse region");
        assert_eq!(parsed, Region::UsWest2);
    }

    #[test]
    fn stack_status_serde_is_screaming_snake() {
        let parsed: StackStatus = serde_json::from_str("\"CREATING\"").expect("parse status");
        assert_eq!(parsed, StackStatus::Creating);
        assert_eq!(parsed.to_string(), "CREATING");
    }
}
