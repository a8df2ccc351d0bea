//! MCP Resources Module
//!
//! Read-only JSON snapshots of Cycloid data, addressed as `cycloid://{name}`.
//! A snapshot is always valid JSON: when the CLI fails the envelope carries
//! an `error` string, an empty list and a zero count instead.

use serde_json::json;
use tracing::{debug, error, instrument};

use crate::cycloid::{process_list, Credentials, CycloidCli, Invocation};
use crate::errors::RetryPolicy;
use crate::mcp::error::McpError;
use crate::mcp::protocol::{Resource, ResourceContent, ResourcesListResult};
use crate::mcp::tools::{blueprints, catalogs, events::EventFilters, pipelines};
use crate::observability::MetricsRecorder;

const MIME_TYPE: &str = "application/json";

/// Resources exposed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycloidResource {
    CatalogRepositories,
    Events,
    Pipelines,
    Blueprints,
}

impl CycloidResource {
    pub const ALL: [CycloidResource; 4] =
        [Self::CatalogRepositories, Self::Events, Self::Pipelines, Self::Blueprints];

    pub fn uri(&self) -> &'static str {
        match self {
            Self::CatalogRepositories => "cycloid://service-catalogs-repositories",
            Self::Events => "cycloid://events",
            Self::Pipelines => "cycloid://pipelines",
            Self::Blueprints => "cycloid://blueprints",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource| resource.uri() == uri)
    }

    /// Name of the list in the snapshot envelope
    pub fn envelope_key(&self) -> &'static str {
        match self {
            Self::CatalogRepositories => "repositories",
            Self::Events => "events",
            Self::Pipelines => "pipelines",
            Self::Blueprints => "blueprints",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::CatalogRepositories => "Service catalog repositories",
            Self::Events => "Organization events",
            Self::Pipelines => "Pipelines",
            Self::Blueprints => "Blueprints",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::CatalogRepositories => "All available service catalog repositories",
            Self::Events => "Recent organization events",
            Self::Pipelines => "All pipelines of the organization",
            Self::Blueprints => "All available blueprints",
        }
    }

    fn invocation(&self) -> Invocation {
        match self {
            Self::CatalogRepositories => catalogs::list_invocation(),
            Self::Events => EventFilters::default().invocation(),
            Self::Pipelines => pipelines::list_invocation(),
            Self::Blueprints => blueprints::list_invocation(),
        }
    }

    fn list_key(&self) -> Option<&'static str> {
        match self {
            Self::Blueprints => Some(blueprints::LIST_KEY),
            _ => None,
        }
    }

    /// Prefix of the `error` field of a failed snapshot
    fn error_prefix(&self) -> Option<&'static str> {
        match self {
            Self::CatalogRepositories => Some("Failed to load service catalog repositories"),
            Self::Events => None,
            Self::Pipelines => Some("Failed to load pipelines"),
            Self::Blueprints => Some("Failed to load blueprints"),
        }
    }

    pub fn descriptor(&self) -> Resource {
        Resource {
            uri: self.uri().to_string(),
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            mime_type: Some(MIME_TYPE.to_string()),
        }
    }
}

/// Result of `resources/list`
pub fn list_resources() -> ResourcesListResult {
    ResourcesListResult {
        resources: CycloidResource::ALL.iter().map(CycloidResource::descriptor).collect(),
        next_cursor: None,
    }
}

/// Build the snapshot for `uri`.
///
/// Unknown URIs are a protocol error; CLI failures are not.
#[instrument(skip(cli, credentials, policy), fields(uri = %uri), name = "mcp_read_resource")]
pub async fn read_resource(
    cli: &CycloidCli,
    credentials: &Credentials,
    policy: &RetryPolicy,
    uri: &str,
) -> Result<ResourceContent, McpError> {
    let resource = CycloidResource::from_uri(uri)
        .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;
    let key = resource.envelope_key();

    let outcome = cli.execute_json_with_retry(credentials, &resource.invocation(), policy).await;
    MetricsRecorder::new().record_resource_read(resource.uri(), outcome.is_ok());

    let snapshot = match outcome {
        Ok(data) => {
            let items = process_list(&data, resource.list_key());
            debug!(count = items.len(), "Resource snapshot loaded");
            json!({ key: items, "count": items.len() })
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Failed to load resource snapshot");
            let message = match resource.error_prefix() {
                Some(prefix) => format!("{prefix}: {e}"),
                None => e.to_string(),
            };
            json!({ "error": message, key: [], "count": 0 })
        }
    };

    Ok(ResourceContent {
        uri: uri.to_string(),
        mime_type: Some(MIME_TYPE.to_string()),
        text: serde_json::to_string_pretty(&snapshot)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credentials, MockRunner};
    use serde_json::Value;
    use std::sync::Arc;

    fn cli(runner: Arc<MockRunner>) -> CycloidCli {
        CycloidCli::with_runner(Default::default(), runner)
    }

    #[test]
    fn test_uris_round_trip() {
        for resource in CycloidResource::ALL {
            assert_eq!(CycloidResource::from_uri(resource.uri()), Some(resource));
        }
        assert_eq!(CycloidResource::from_uri("cycloid://stacks"), None);
        assert_eq!(list_resources().resources.len(), 4);
    }

    #[tokio::test]
    async fn test_blueprint_snapshot() {
        let runner = Arc::new(MockRunner::new().respond_json(json!({
            "service_catalogs": [{"ref": "cycloid:a"}, {"ref": "cycloid:b"}]
        })));
        let content = read_resource(
            &cli(runner.clone()),
            &credentials(),
            &RetryPolicy::none(),
            "cycloid://blueprints",
        )
        .await
        .unwrap();

        let body: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(body["count"], 2);
        assert_eq!(body["blueprints"][1]["ref"], "cycloid:b");
        assert_eq!(content.mime_type.as_deref(), Some("application/json"));
        assert_eq!(&runner.calls()[0].argv[1..4], ["stacks", "list", "--blueprint"]);
    }

    #[tokio::test]
    async fn test_failure_yields_error_envelope() {
        let runner = Arc::new(MockRunner::new().respond(1, "", "forbidden"));
        let content = read_resource(
            &cli(runner),
            &credentials(),
            &RetryPolicy::none(),
            "cycloid://pipelines",
        )
        .await
        .unwrap();

        let body: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(body["count"], 0);
        assert_eq!(body["pipelines"], json!([]));
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to load pipelines: "));
        assert!(error.contains("forbidden"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let runner = Arc::new(
            MockRunner::new()
                .respond(1, "", "connection reset by peer")
                .respond_json(json!([{"id": 1}])),
        );
        let policy = RetryPolicy { max_attempts: 3, base_delay: std::time::Duration::ZERO };
        let content =
            read_resource(&cli(runner.clone()), &credentials(), &policy, "cycloid://events")
                .await
                .unwrap();

        let body: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_uri() {
        let runner = Arc::new(MockRunner::new());
        let err = read_resource(&cli(runner), &credentials(), &RetryPolicy::none(), "cycloid://x")
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ResourceNotFound(_)));
    }
}
