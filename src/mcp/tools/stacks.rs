//! MCP Tool for creating stacks from blueprints
//!
//! Creation walks a fixed sequence of elicitations before anything is run:
//!
//! ```text
//! AwaitingName -> AwaitingUseCase -> AwaitingCatalogSource
//!     -> AwaitingConfirmation -> Executing -> Succeeded | Failed
//! ```
//!
//! A decline, cancel, empty or unknown answer ends the flow as `Cancelled`
//! without touching the CLI. Callers that already know every parameter can
//! pass them directly and skip elicitation entirely.

use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::blueprints::{self, fetch_blueprints, find_blueprint};
use super::{string_arg, ToolContext};
use crate::cycloid::{process_list, Invocation};
use crate::errors::format_cli_error;
use crate::mcp::display_hints::use_cases;
use crate::mcp::elicitation::{ElicitResponse, ElicitSchema, ElicitationError};
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::observability::MetricsRecorder;

pub const NAME: &str = "CYCLOID_BLUEPRINT_STACK_CREATE";

const ACTION: &str = "create stack";

/// List key of `cy catalog-repository list` as used during creation
const CATALOG_LIST_KEY: &str = "catalog_repositories";

const CONFIRM_KEYWORD: &str = "confirm";

const UNSUPPORTED_MESSAGE: &str = "❌ This tool requires interactive elicitation support, \
    which is not available in this client. Please use a client that supports elicitation.";

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid slug pattern"));
static DASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid dash pattern"));

pub fn cycloid_blueprint_stack_create_tool() -> Tool {
    Tool::new(
        NAME,
        "Create a new stack from a blueprint. The user is asked interactively for the \
         stack name, the use case and the service catalog source, then for a final \
         confirmation. When name, use_case and service_catalog_source_canonical are all \
         provided the stack is created directly without prompts.",
        json!({
            "type": "object",
            "properties": {
                "ref": {
                    "type": "string",
                    "description": "Blueprint reference (e.g. 'cycloid:stack-aws-ec2')"
                },
                "name": {
                    "type": "string",
                    "description": "Stack name (direct mode)"
                },
                "use_case": {
                    "type": "string",
                    "description": "Blueprint use case (direct mode)"
                },
                "service_catalog_source_canonical": {
                    "type": "string",
                    "description": "Canonical of the service catalog repository (direct mode)"
                }
            },
            "required": ["ref"]
        }),
    )
}

/// Canonical stack identifier derived from a display name.
///
/// Lower-cased, characters outside `[a-z0-9-]` replaced by `-`, dash runs
/// collapsed and leading/trailing dashes removed.
pub fn stack_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Fully resolved parameters of a creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub blueprint_ref: String,
    pub name: String,
    pub use_case: String,
    pub catalog_source: String,
}

impl StackRequest {
    pub fn slug(&self) -> String {
        stack_slug(&self.name)
    }

    /// `cy stack create --blueprint-ref R --name N --stack SLUG --use-case U --catalog-repository C`
    pub fn invocation(&self) -> Invocation {
        Invocation::new("stack")
            .arg("create")
            .flag("blueprint-ref", self.blueprint_ref.as_str())
            .flag("name", self.name.as_str())
            .flag("stack", self.slug())
            .flag("use-case", self.use_case.as_str())
            .flag("catalog-repository", self.catalog_source.as_str())
    }

    fn confirmation_message(&self) -> String {
        format!(
            "You are about to create a stack with the following details:\n\
             - Blueprint Ref: {}\n\
             - Name: {}\n\
             - Use Case: {}\n\
             - Service Catalog Source Canonical: {}\n\
             Please confirm by typing 'confirm' to proceed.",
            self.blueprint_ref, self.name, self.use_case, self.catalog_source
        )
    }
}

/// Position in the creation flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCreation {
    AwaitingName,
    AwaitingUseCase { name: String },
    AwaitingCatalogSource { name: String, use_case: String },
    AwaitingConfirmation(StackRequest),
    Executing(StackRequest),
    Succeeded(String),
    Failed(String),
    Cancelled(String),
}

impl StackCreation {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_) | Self::Cancelled(_))
    }

    fn state_name(&self) -> &'static str {
        match self {
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingUseCase { .. } => "awaiting_use_case",
            Self::AwaitingCatalogSource { .. } => "awaiting_catalog_source",
            Self::AwaitingConfirmation(_) => "awaiting_confirmation",
            Self::Executing(_) => "executing",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
            Self::Cancelled(_) => "cancelled",
        }
    }

    fn into_result(self) -> ToolCallResult {
        match self {
            Self::Succeeded(text) | Self::Cancelled(text) => ToolCallResult::text(text),
            Self::Failed(text) => ToolCallResult::error(text),
            other => ToolCallResult::error(format!(
                "❌ Stack creation stopped in state '{}'",
                other.state_name()
            )),
        }
    }
}

/// Validation shared by the interactive and direct paths.
fn check_name(name: &str) -> Result<String, StackCreation> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StackCreation::Cancelled(
            "❌ Stack name cannot be empty. Please provide a valid name.".to_string(),
        ));
    }
    if stack_slug(name).is_empty() {
        return Err(StackCreation::Cancelled(
            "❌ Stack name must contain at least one letter or digit.".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn check_use_case(use_case: &str, available: &[String]) -> Result<String, StackCreation> {
    if available.iter().any(|u| u == use_case) {
        Ok(use_case.to_string())
    } else {
        Err(StackCreation::Cancelled(format!(
            "❌ Invalid use case '{use_case}'. Available options are: {}",
            available.join(", ")
        )))
    }
}

fn check_catalog_source(source: &str, available: &[String]) -> Result<String, StackCreation> {
    if available.iter().any(|c| c == source) {
        Ok(source.to_string())
    } else {
        Err(StackCreation::Cancelled(format!(
            "❌ Invalid service catalog source '{source}'. Available options are: {}",
            available.join(", ")
        )))
    }
}

/// Drives one creation from `AwaitingName` to a terminal state.
struct StackFlow<'a> {
    ctx: &'a ToolContext,
    blueprint_ref: String,
    use_cases: Vec<String>,
    catalog_sources: Option<Vec<String>>,
}

impl<'a> StackFlow<'a> {
    fn new(ctx: &'a ToolContext, blueprint_ref: String, use_cases: Vec<String>) -> Self {
        Self { ctx, blueprint_ref, use_cases, catalog_sources: None }
    }

    async fn run(mut self, mut state: StackCreation) -> StackCreation {
        while !state.is_terminal() {
            debug!(state = state.state_name(), "Stack creation step");
            state = match self.step(state).await {
                Ok(next) | Err(next) => next,
            };
        }
        info!(
            correlation_id = %self.ctx.correlation_id,
            outcome = state.state_name(),
            "Stack creation finished"
        );
        state
    }

    async fn step(&mut self, state: StackCreation) -> Result<StackCreation, StackCreation> {
        Ok(match state {
            StackCreation::AwaitingName => {
                let answer = self
                    .ask("What would you like to name your stack? ", ElicitSchema::Text)
                    .await?;
                let name = accepted(answer, "Stack creation cancelled - no stack name provided.")?;
                StackCreation::AwaitingUseCase { name: check_name(&name)? }
            }
            StackCreation::AwaitingUseCase { name } => {
                let message = format!(
                    "Which use case would you like to use? Available options: {}",
                    self.use_cases.join(", ")
                );
                let answer =
                    self.ask(&message, ElicitSchema::Choice(self.use_cases.clone())).await?;
                let use_case = accepted(answer, "Stack creation cancelled - no use case provided.")?;
                let use_case = check_use_case(&use_case, &self.use_cases)?;
                StackCreation::AwaitingCatalogSource { name, use_case }
            }
            StackCreation::AwaitingCatalogSource { name, use_case } => {
                let sources = self.catalog_sources().await?;
                let message = format!(
                    "Which service catalog source should I use? Available options: {}",
                    sources.join(", ")
                );
                let answer = self.ask(&message, ElicitSchema::Choice(sources.clone())).await?;
                let source = accepted(
                    answer,
                    "Stack creation cancelled - no service catalog source provided.",
                )?;
                StackCreation::AwaitingConfirmation(StackRequest {
                    blueprint_ref: self.blueprint_ref.clone(),
                    name,
                    use_case,
                    catalog_source: check_catalog_source(&source, &sources)?,
                })
            }
            StackCreation::AwaitingConfirmation(request) => {
                let answer = self.ask(&request.confirmation_message(), ElicitSchema::Text).await?;
                let typed = accepted(answer, "Stack creation cancelled by user.")?;
                if !typed.eq_ignore_ascii_case(CONFIRM_KEYWORD) {
                    return Err(StackCreation::Cancelled(
                        "Stack creation cancelled - user did not type 'confirm'.".to_string(),
                    ));
                }
                StackCreation::Executing(request)
            }
            StackCreation::Executing(request) => execute_request(self.ctx, &request).await,
            terminal => terminal,
        })
    }

    async fn ask(
        &self,
        message: &str,
        schema: ElicitSchema,
    ) -> Result<ElicitResponse, StackCreation> {
        let response = self.ctx.elicitor.elicit(message, schema).await;
        let action = match &response {
            Ok(answer) => answer.action.as_str(),
            Err(ElicitationError::Closed) => "closed",
            Err(_) => "error",
        };
        MetricsRecorder::new().record_elicitation(action);

        // Any failure to reach the client ends the flow the same way.
        response.map_err(|error| {
            warn!(correlation_id = %self.ctx.correlation_id, error = %error, "Elicitation failed");
            StackCreation::Cancelled(UNSUPPORTED_MESSAGE.to_string())
        })
    }

    /// Canonicals of the organization's catalog repositories, fetched once.
    async fn catalog_sources(&mut self) -> Result<Vec<String>, StackCreation> {
        if let Some(sources) = &self.catalog_sources {
            return Ok(sources.clone());
        }
        let sources = fetch_catalog_sources(self.ctx).await?;
        self.catalog_sources = Some(sources.clone());
        Ok(sources)
    }
}

/// Trimmed value of an accepted answer, or `Cancelled(reason)` for a
/// decline, a cancel or an answer without content.
fn accepted(answer: ElicitResponse, reason: &str) -> Result<String, StackCreation> {
    answer
        .accepted_value()
        .map(str::to_string)
        .ok_or_else(|| StackCreation::Cancelled(reason.to_string()))
}

async fn fetch_catalog_sources(ctx: &ToolContext) -> Result<Vec<String>, StackCreation> {
    let invocation = super::catalogs::list_invocation();
    let data = ctx.cli.execute_json(&ctx.credentials, &invocation).await.map_err(|e| {
        StackCreation::Failed(format!("❌ Failed to fetch catalog repositories: {e}"))
    })?;

    let sources: Vec<String> = process_list(&data, Some(CATALOG_LIST_KEY))
        .iter()
        .filter_map(|repo| repo.get("canonical").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    if sources.is_empty() {
        return Err(StackCreation::Failed(
            "❌ No catalog repositories found. Please check your configuration.".to_string(),
        ));
    }
    Ok(sources)
}

async fn execute_request(ctx: &ToolContext, request: &StackRequest) -> StackCreation {
    info!(
        correlation_id = %ctx.correlation_id,
        blueprint_ref = %request.blueprint_ref,
        stack = %request.slug(),
        use_case = %request.use_case,
        "Creating stack"
    );

    match ctx.cli.execute(&ctx.credentials, &request.invocation()).await {
        Ok(result) if result.success() => StackCreation::Succeeded(format!(
            "✅ Stack '{}' created successfully!\n{}",
            request.name, result.stdout
        )),
        Ok(result) => {
            StackCreation::Failed(format!("❌ Failed to create stack: {}", result.stderr))
        }
        Err(e) => StackCreation::Failed(format_cli_error(
            ACTION,
            &e,
            &[],
            Some(&ctx.correlation_id),
        )),
    }
}

/// Parameters given up front by a caller that skips elicitation.
fn direct_request(args: &Value) -> Option<(String, String, String)> {
    Some((
        string_arg(args, "name")?,
        string_arg(args, "use_case")?,
        string_arg(args, "service_catalog_source_canonical")?,
    ))
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_create_stack")]
pub async fn execute_create_stack(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let Some(blueprint_ref) = string_arg(&args, "ref") else {
        return ctx.invalid_arguments(ACTION, "Missing required parameter 'ref'");
    };

    let blueprints = match fetch_blueprints(&ctx.cli, &ctx.credentials).await {
        Ok(blueprints) => blueprints,
        Err(e) => return ctx.cli_failure(blueprints::ACTION, &e, blueprints::SUGGESTIONS),
    };
    let Some(blueprint) = find_blueprint(&blueprints, &blueprint_ref) else {
        return ToolCallResult::error(format!(
            "❌ Blueprint '{blueprint_ref}' not found. Please check the blueprint reference."
        ));
    };
    let available = use_cases(blueprint);
    if available.is_empty() {
        return ToolCallResult::error(format!(
            "❌ No use cases found for blueprint '{blueprint_ref}'. \
             This blueprint may not be properly configured."
        ));
    }
    debug!(blueprint_ref = %blueprint_ref, use_cases = ?available, "Blueprint validated");

    if let Some((name, use_case, source)) = direct_request(&args) {
        info!(blueprint_ref = %blueprint_ref, "Creating stack with explicit parameters");
        return create_direct(ctx, blueprint_ref, &available, &name, &use_case, &source).await;
    }

    if !ctx.elicitor.is_supported() {
        return ToolCallResult::text(UNSUPPORTED_MESSAGE);
    }

    StackFlow::new(ctx, blueprint_ref, available)
        .run(StackCreation::AwaitingName)
        .await
        .into_result()
}

async fn create_direct(
    ctx: &ToolContext,
    blueprint_ref: String,
    available: &[String],
    name: &str,
    use_case: &str,
    source: &str,
) -> ToolCallResult {
    let validated = async move {
        let name = check_name(name)?;
        let use_case = check_use_case(use_case, available)?;
        let sources = fetch_catalog_sources(ctx).await?;
        let catalog_source = check_catalog_source(source, &sources)?;
        Ok::<_, StackCreation>(StackRequest { blueprint_ref, name, use_case, catalog_source })
    };

    match validated.await {
        Ok(request) => execute_request(ctx, &request).await.into_result(),
        Err(stopped) => stopped.into_result(),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_create_stack(ctx, args))
}
