//! Template and parameter document loading.
//!
//! The remote service owns schema validation; this module only performs the
//! checks that must happen before any remote call is made: documents must be
//! readable JSON, parameter keys must be unique, and identity-bearing
//! templates must be explicitly acknowledged.
use crate::stack::{Capability, Parameter};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Resource type prefix that requires the named-IAM capability.
const IDENTITY_TYPE_PREFIX: &str = "Identity::";

/// Load the template document as an opaque body.
///
/// The body is forwarded to the service unmodified; locally it only has to
/// be non-empty JSON with an object at the root.
pub fn load_template(path: &Path) -> Result<String> {
    let body =
        fs::read_to_string(path).with_context(|| format!("read template {}", path.display()))?;
    if body.trim().is_empty() {
        return Err(anyhow!("template {} is empty", path.display()));
    }
    let value: Value = serde_json::from_str(&body)
        .with_context(|| format!("parse template {}", path.display()))?;
    if !value.is_object() {
        return Err(anyhow!(
            "template {} must contain a JSON object at the root",
            path.display()
        ));
    }
    Ok(body)
}

/// Load the parameter document: a JSON array of `{key, value}` pairs.
///
/// Order is preserved for the wire; duplicate keys are rejected here so a
/// malformed document never produces a remote call.
pub fn load_parameters(path: &Path) -> Result<Vec<Parameter>> {
    let bytes =
        fs::read(path).with_context(|| format!("read parameters {}", path.display()))?;
    let parameters: Vec<Parameter> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse parameters {}", path.display()))?;
    let mut seen = BTreeSet::new();
    for parameter in &parameters {
        if !seen.insert(parameter.key.as_str()) {
            return Err(anyhow!(
                "duplicate parameter key {:?} in {}",
                parameter.key,
                path.display()
            ));
        }
    }
    Ok(parameters)
}

/// Capabilities the template requires based on its declared resource types.
///
/// Scans `resources.<logical_id>.type`; any `Identity::*` resource demands
/// `CAPABILITY_NAMED_IAM`.
pub fn required_capabilities(template_body: &str) -> Result<BTreeSet<Capability>> {
    let value: Value = serde_json::from_str(template_body).context("parse template body")?;
    let mut required = BTreeSet::new();
    let Some(resources) = value.get("resources").and_then(Value::as_object) else {
        return Ok(required);
    };
    for (logical_id, resource) in resources {
        let Some(resource_type) = resource.get("type").and_then(Value::as_str) else {
            return Err(anyhow!("resource {logical_id:?} is missing a type"));
        };
        if resource_type.starts_with(IDENTITY_TYPE_PREFIX) {
            required.insert(Capability::NamedIam);
        }
    }
    Ok(required)
}

/// Reject identity-bearing templates unless the escalation was acknowledged.
pub fn check_capabilities(
    required: &BTreeSet<Capability>,
    granted: &BTreeSet<Capability>,
) -> Result<()> {
    let missing: Vec<&Capability> = required.difference(granted).collect();
    if missing.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = missing
        .iter()
        .map(|capability| capability.to_string())
        .collect();
    Err(anyhow!(
        "template requires capabilities not acknowledged: {} (pass --allow-iam)",
        names.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn template_must_be_a_json_object() {
        let file = write_temp("[1, 2, 3]");
        let err = load_template(file.path()).expect_err("array template");
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn empty_template_is_rejected() {
        let file = write_temp("  \n");
        assert!(load_template(file.path()).is_err());
    }

    #[test]
    fn parameters_preserve_document_order() {
        let file = write_temp(
            r#"[{"key": "zone", "value": "a"}, {"key": "size", "value": "small"}]"#,
        );
        let parameters = load_parameters(file.path()).expect("load parameters");
        let keys: Vec<&str> = parameters.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["zone", "size"]);
    }

    #[test]
    fn duplicate_parameter_keys_are_rejected() {
        let file = write_temp(
            r#"[{"key": "zone", "value": "a"}, {"key": "zone", "value": "b"}]"#,
        );
        let err = load_parameters(file.path()).expect_err("duplicate keys");
        assert!(err.to_string().contains("duplicate parameter key"));
    }

    #[test]
    fn identity_resources_require_named_iam() {
        let template = r#"{
            "resources": {
                "deploy_role": {"type": "Identity::Role"},
                "vpc": {"type": "Network::Vpc"}
            }
        }"#;
        let required = required_capabilities(template).expect("scan template");
        assert!(required.contains(&Capability::NamedIam));
    }

    #[test]
    fn plain_templates_require_nothing() {
        let template = r#"{"resources": {"vpc": {"type": "Network::Vpc"}}}"#;
        let required = required_capabilities(template).expect("scan template");
        assert!(required.is_empty());
    }

    #[test]
    fn missing_resource_type_is_an_error() {
        let template = r#"{"resources": {"vpc": {"cidr": "10.0.0.0/16"}}}"#;
        assert!(required_capabilities(template).is_err());
    }

    #[test]
    fn unacknowledged_capability_names_the_flag() {
        let mut required = BTreeSet::new();
        required.insert(Capability::NamedIam);
        let err = check_capabilities(&required, &BTreeSet::new()).expect_err("missing capability");
        assert!(err.to_string().contains("--allow-iam"));
        assert!(err.to_string().contains("CAPABILITY_NAMED_IAM"));
    }

    #[test]
    fn acknowledged_capability_passes() {
        let mut required = BTreeSet::new();
        required.insert(Capability::NamedIam);
        assert!(check_capabilities(&required, &required).is_ok());
    }
}
