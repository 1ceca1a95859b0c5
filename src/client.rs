//! Stack client for the remote provisioning API.
//!
//! One JSON-over-HTTP call per invocation, no retry and no backoff: the
//! remote service owns all stack state and all idempotence guarantees.
//! `StackBackend` is the seam so command logic can be exercised against an
//! in-memory backend in tests.
use crate::error::{ApiError, ApiErrorKind};
use crate::stack::{Capability, Parameter, Region, StackDescription, StackId, StackRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use ureq::Agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RAW_ERROR_BYTES: usize = 512;

/// The provisioning calls the dispatcher needs. One remote call each.
pub trait StackBackend {
    /// Resolve a stack name in a region. `None` means the name is absent.
    fn describe(
        &self,
        region: Region,
        stack_name: &str,
    ) -> Result<Option<StackDescription>, ApiError>;

    /// Create a new stack. Fails if the name already exists in the region,
    /// the template fails remote schema validation, or capabilities are
    /// missing.
    fn create(&self, request: &StackRequest) -> Result<StackId, ApiError>;

    /// Update an existing stack. Fails if the stack is absent, the service
    /// detects no changes, or a concurrent update holds the remote lock.
    fn update(&self, request: &StackRequest) -> Result<(), ApiError>;

    /// Delete an existing stack. Fails if the stack is absent.
    fn delete(&self, region: Region, stack_name: &str) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct CreateStackBody<'a> {
    stack_name: &'a str,
    template_body: &'a str,
    parameters: &'a [Parameter],
    capabilities: &'a BTreeSet<Capability>,
}

#[derive(Serialize)]
struct UpdateStackBody<'a> {
    template_body: &'a str,
    parameters: &'a [Parameter],
    capabilities: &'a BTreeSet<Capability>,
}

#[derive(Deserialize)]
struct CreateStackResponse {
    stack_id: StackId,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    code: String,
    message: String,
}

/// `StackBackend` over the service's HTTP surface.
pub struct HttpBackend {
    agent: Agent,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: &str) -> HttpBackend {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        HttpBackend {
            agent,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn stack_url(&self, region: Region, stack_name: &str) -> String {
        format!("{}/v1/{}/stacks/{}", self.endpoint, region, stack_name)
    }

    fn stacks_url(&self, region: Region) -> String {
        format!("{}/v1/{}/stacks", self.endpoint, region)
    }

    fn read_response(
        &self,
        response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<String, ApiError> {
        let mut response = response.map_err(|err| ApiError::transport(err.to_string()))?;
        let status = response.status().as_u16();
        let raw = response
            .body_mut()
            .read_to_string()
            .map_err(|err| ApiError::transport(err.to_string()))?;
        tracing::debug!(status, bytes = raw.len(), "provisioning response");
        if (200..300).contains(&status) {
            Ok(raw)
        } else {
            Err(api_error_from_response(status, &raw))
        }
    }
}

impl StackBackend for HttpBackend {
    fn describe(
        &self,
        region: Region,
        stack_name: &str,
    ) -> Result<Option<StackDescription>, ApiError> {
        let url = self.stack_url(region, stack_name);
        tracing::info!(%region, stack_name, "describe stack");
        let raw = match self.read_response(self.agent.get(&url).call()) {
            Ok(raw) => raw,
            Err(err) if err.kind == ApiErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let description: StackDescription = serde_json::from_str(&raw)
            .map_err(|err| ApiError::transport(format!("parse describe response: {err}")))?;
        Ok(Some(description))
    }

    fn create(&self, request: &StackRequest) -> Result<StackId, ApiError> {
        let url = self.stacks_url(request.region);
        let body = CreateStackBody {
            stack_name: &request.stack_name,
            template_body: &request.template_body,
            parameters: &request.parameters,
            capabilities: &request.capabilities,
        };
        tracing::info!(region = %request.region, stack_name = request.stack_name, "create stack");
        let raw = self.read_response(self.agent.post(&url).send_json(&body))?;
        let response: CreateStackResponse = serde_json::from_str(&raw)
            .map_err(|err| ApiError::transport(format!("parse create response: {err}")))?;
        Ok(response.stack_id)
    }

    fn update(&self, request: &StackRequest) -> Result<(), ApiError> {
        let url = self.stack_url(request.region, &request.stack_name);
        let body = UpdateStackBody {
            template_body: &request.template_body,
            parameters: &request.parameters,
            capabilities: &request.capabilities,
        };
        tracing::info!(region = %request.region, stack_name = request.stack_name, "update stack");
        self.read_response(self.agent.post(&url).send_json(&body))?;
        Ok(())
    }

    fn delete(&self, region: Region, stack_name: &str) -> Result<(), ApiError> {
        let url = self.stack_url(region, stack_name);
        tracing::info!(%region, stack_name, "delete stack");
        self.read_response(self.agent.delete(&url).call())?;
        Ok(())
    }
}

/// Map a non-2xx response onto a typed error, keeping the remote message
/// verbatim. Bodies that are not an error envelope surface as `Remote` with
/// the raw text.
fn api_error_from_response(status: u16, raw: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => ApiError::new(ApiErrorKind::from_code(&envelope.code), envelope.message),
        Err(_) => ApiError::new(
            ApiErrorKind::Remote,
            format!("HTTP {status}: {}", truncate(raw.trim(), MAX_RAW_ERROR_BYTES)),
        ),
    }
}

fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackStatus;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory provisioning backend with the same refusal semantics as
    /// the real service.
    #[derive(Default)]
    struct FakeBackend {
        stacks: RefCell<BTreeMap<(Region, String), StackDescription>>,
    }

    impl StackBackend for FakeBackend {
        fn describe(
            &self,
            region: Region,
            stack_name: &str,
        ) -> Result<Option<StackDescription>, ApiError> {
            let stacks = self.stacks.borrow();
            Ok(stacks.get(&(region, stack_name.to_string())).cloned())
        }

        fn create(&self, request: &StackRequest) -> Result<StackId, ApiError> {
            let mut stacks = self.stacks.borrow_mut();
            let key = (request.region, request.stack_name.clone());
            if stacks.contains_key(&key) {
                return Err(ApiError::new(
                    ApiErrorKind::AlreadyExists,
                    format!("stack {} already exists", request.stack_name),
                ));
            }
            let stack_id = StackId(format!("stack/{}/{}", request.region, request.stack_name));
            stacks.insert(
                key,
                StackDescription {
                    stack_id: stack_id.clone(),
                    stack_name: request.stack_name.clone(),
                    status: StackStatus::Creating,
                },
            );
            Ok(stack_id)
        }

        fn update(&self, request: &StackRequest) -> Result<(), ApiError> {
            let stacks = self.stacks.borrow();
            let key = (request.region, request.stack_name.clone());
            if !stacks.contains_key(&key) {
                return Err(ApiError::new(
                    ApiErrorKind::NotFound,
                    format!("stack {} does not exist", request.stack_name),
                ));
            }
            Ok(())
        }

        fn delete(&self, region: Region, stack_name: &str) -> Result<(), ApiError> {
            let mut stacks = self.stacks.borrow_mut();
            if stacks.remove(&(region, stack_name.to_string())).is_none() {
                return Err(ApiError::new(
                    ApiErrorKind::NotFound,
                    format!("stack {stack_name} does not exist"),
                ));
            }
            Ok(())
        }
    }

    fn request(name: &str, region: Region) -> StackRequest {
        StackRequest {
            stack_name: name.to_string(),
            region,
            template_body: r#"{"resources": {}}"#.to_string(),
            parameters: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    #[test]
    fn created_stack_name_becomes_resolvable() {
        let backend = FakeBackend::default();
        let region = Region::UsEast1;
        assert!(backend.describe(region, "edge").expect("describe").is_none());

        let stack_id = backend.create(&request("edge", region)).expect("create");
        let description = backend
            .describe(region, "edge")
            .expect("describe")
            .expect("stack resolvable after create");
        assert_eq!(description.stack_id, stack_id);
    }

    #[test]
    fn create_on_existing_name_fails_already_exists() {
        let backend = FakeBackend::default();
        let region = Region::UsEast1;
        backend.create(&request("edge", region)).expect("create");

        let err = backend
            .create(&request("edge", region))
            .expect_err("second create");
        assert_eq!(err.kind, ApiErrorKind::AlreadyExists);
    }

    #[test]
    fn stack_names_are_scoped_per_region() {
        let backend = FakeBackend::default();
        backend
            .create(&request("edge", Region::UsEast1))
            .expect("create us-east-1");
        backend
            .create(&request("edge", Region::EuWest1))
            .expect("same name in eu-west-1");
    }

    #[test]
    fn update_on_absent_name_fails_not_found() {
        let backend = FakeBackend::default();
        let err = backend
            .update(&request("ghost", Region::UsWest2))
            .expect_err("update absent stack");
        assert_eq!(err.kind, ApiErrorKind::NotFound);
    }

    #[test]
    fn delete_removes_the_name() {
        let backend = FakeBackend::default();
        let region = Region::EuCentral1;
        backend.create(&request("edge", region)).expect("create");
        backend.delete(region, "edge").expect("delete");
        assert!(backend.describe(region, "edge").expect("describe").is_none());
    }

    #[test]
    fn error_envelope_maps_onto_kind_with_verbatim_message() {
        let raw = r#"{"code": "NoChanges", "message": "No updates are to be performed."}"#;
        let err = api_error_from_response(409, raw);
        assert_eq!(err.kind, ApiErrorKind::NoChanges);
        assert_eq!(err.message, "No updates are to be performed.");
    }

    #[test]
    fn unknown_code_surfaces_as_remote() {
        let raw = r#"{"code": "Throttled", "message": "slow down"}"#;
        let err = api_error_from_response(429, raw);
        assert_eq!(err.kind, ApiErrorKind::Remote);
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn non_envelope_body_keeps_raw_text_and_status() {
        let err = api_error_from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.kind, ApiErrorKind::Remote);
        assert!(err.message.contains("HTTP 502"));
        assert!(err.message.contains("bad gateway"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo";
        let cut = truncate(text, 2);
        assert_eq!(cut, "h");
    }
}
