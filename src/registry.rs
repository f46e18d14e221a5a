//! Tool registry.
//!
//! Every SimplyBook tool goes through the same path: decode arguments, make
//! sure a session exists, call upstream with the session headers and wrap the
//! outcome in a [`ToolEnvelope`]. Domain routers only describe their tools;
//! [`ToolRegistry`] owns the pipeline.

use std::{
    collections::{BTreeMap, HashSet},
    future::Future,
    sync::Arc,
    time::Instant,
};

use futures::future::{BoxFuture, FutureExt};
use rmcp::{
    model::{JsonObject, Tool},
    schemars::{self, JsonSchema},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiClient, AuthorizedClient},
    envelope::{ToolEnvelope, AUTH_FAILED_MESSAGE},
    error::{ApiResult, ServerError, ServerResult},
    session::SessionManager,
};

type ToolHandler =
    Arc<dyn Fn(ToolContext, JsonObject) -> BoxFuture<'static, ToolEnvelope> + Send + Sync>;

/// Shared state handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    session: Arc<SessionManager>,
    api: ApiClient,
}

impl ToolContext {
    pub fn new(session: Arc<SessionManager>, api: ApiClient) -> Self {
        Self { session, api }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Run one upstream call under the current session.
    ///
    /// No upstream request is made when a session cannot be established. A
    /// 401 from upstream drops the token that was used so the next call
    /// re-authenticates.
    pub async fn invoke<F, Fut>(&self, tool: &str, call: F) -> ToolEnvelope
    where
        F: FnOnce(AuthorizedClient) -> Fut,
        Fut: Future<Output = ApiResult<Value>>,
    {
        if !self.session.ensure_authenticated().await {
            warn!(tool, "No SimplyBook session, skipping upstream call");
            return ToolEnvelope::failure(match self.session.last_auth_error() {
                Some(cause) => format!("{} ({})", AUTH_FAILED_MESSAGE, cause),
                None => AUTH_FAILED_MESSAGE.to_string(),
            });
        }

        let headers = self.session.get_auth_headers();
        let token = headers.token().map(str::to_string);
        let started = Instant::now();

        match call(self.api.authorized(headers)).await {
            Ok(result) => {
                debug!(
                    tool,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                ToolEnvelope::success(result)
            }
            Err(err) => {
                if err.is_unauthorized() {
                    if let Some(token) = token.as_deref() {
                        if self.session.invalidate_token(token) {
                            info!(tool, "Session token rejected upstream, cleared");
                        }
                    }
                }
                warn!(
                    tool,
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call failed"
                );
                ToolEnvelope::failure(format!("{} failed: {}", tool, err))
            }
        }
    }
}

/// Declaration of one tool: metadata plus the upstream call it performs.
pub struct ToolSpec {
    name: &'static str,
    description: &'static str,
    tags: &'static [&'static str],
    schema: Result<JsonObject, String>,
    handler: ToolHandler,
}

impl ToolSpec {
    /// Declare a tool whose arguments decode into `A`. The input schema is
    /// derived from `A`.
    pub fn new<A, F, Fut>(
        name: &'static str,
        description: &'static str,
        tags: &'static [&'static str],
        call: F,
    ) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(AuthorizedClient, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let call = Arc::new(call);
        let handler: ToolHandler = Arc::new(move |ctx: ToolContext, arguments: JsonObject| {
            let call = Arc::clone(&call);
            async move {
                let args: A = match serde_json::from_value(Value::Object(arguments)) {
                    Ok(args) => args,
                    Err(e) => {
                        debug!(tool = name, error = %e, "Rejected tool arguments");
                        return ToolEnvelope::failure(format!(
                            "Invalid arguments for {}: {}",
                            name, e
                        ));
                    }
                };
                ctx.invoke(name, move |client| call(client, args)).await
            }
            .boxed()
        });

        Self {
            name,
            description,
            tags,
            schema: object_schema::<A>(),
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tags(&self) -> &'static [&'static str] {
        self.tags
    }
}

fn object_schema<A: JsonSchema>() -> Result<JsonObject, String> {
    let schema = schemars::schema_for!(A);
    match serde_json::to_value(&schema) {
        Ok(Value::Object(mut map)) => {
            map.remove("$schema");
            match map.get("type").and_then(Value::as_str) {
                Some("object") => Ok(map),
                other => Err(format!("expected an object schema, got type {:?}", other)),
            }
        }
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

/// A group of related tools (bookings, clients, ...).
pub trait DomainRouter: Send + Sync {
    fn name(&self) -> &'static str;

    fn tools(&self) -> Vec<ToolSpec>;
}

struct RegisteredTool {
    tool: Tool,
    router: &'static str,
    tags: &'static [&'static str],
    handler: ToolHandler,
}

/// All tools exposed by the server, keyed by name.
pub struct ToolRegistry {
    context: ToolContext,
    tools: BTreeMap<&'static str, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new(context: ToolContext) -> Self {
        Self {
            context,
            tools: BTreeMap::new(),
        }
    }

    /// Register every tool of `router`. Nothing is registered when any of its
    /// tools collides with an existing name or has an unusable schema.
    pub fn register(&mut self, router: &dyn DomainRouter) -> ServerResult<usize> {
        let specs = router.tools();
        let mut batch = HashSet::with_capacity(specs.len());

        for spec in &specs {
            if let Some(existing) = self.tools.get(spec.name) {
                return Err(ServerError::DuplicateTool {
                    tool: spec.name.to_string(),
                    router: router.name(),
                    existing: existing.router,
                });
            }
            if !batch.insert(spec.name) {
                return Err(ServerError::DuplicateTool {
                    tool: spec.name.to_string(),
                    router: router.name(),
                    existing: router.name(),
                });
            }
            if let Err(reason) = &spec.schema {
                return Err(ServerError::InvalidSchema {
                    tool: spec.name.to_string(),
                    reason: reason.clone(),
                });
            }
        }

        let count = specs.len();
        for spec in specs {
            let Ok(schema) = spec.schema else {
                continue;
            };
            let tool = Tool::new(spec.name, spec.description, Arc::new(schema));
            self.tools.insert(
                spec.name,
                RegisteredTool {
                    tool,
                    router: router.name(),
                    tags: spec.tags,
                    handler: spec.handler,
                },
            );
        }

        debug!(router = router.name(), tools = count, "Registered router");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Tool names in sorted order.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.tool.clone()).collect()
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name).map(|t| &t.tool)
    }

    pub fn tags(&self, name: &str) -> Option<&'static [&'static str]> {
        self.tools.get(name).map(|t| t.tags)
    }

    pub fn router_of(&self, name: &str) -> Option<&'static str> {
        self.tools.get(name).map(|t| t.router)
    }

    pub fn tools_with_tag(&self, tag: &str) -> Vec<&'static str> {
        self.tools
            .iter()
            .filter(|(_, t)| t.tags.contains(&tag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Invoke a tool by name. Returns `None` for unknown tools.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> Option<ToolEnvelope> {
        let registered = self.tools.get(name)?;
        let handler = Arc::clone(&registered.handler);
        Some(handler(self.context.clone(), arguments.unwrap_or_default()).await)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::{
        config::{Credentials, UpstreamConfig},
        error::ApiError,
        session::{Authenticator, IssuedToken},
    };

    struct StaticAuthenticator {
        accept: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for StaticAuthenticator {
        async fn authenticate(&self, _credentials: &Credentials) -> ApiResult<IssuedToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.accept {
                Ok(IssuedToken::new("tok-1"))
            } else {
                Err(ApiError::AuthRejected("bad password".to_string()))
            }
        }
    }

    fn context(accept: bool) -> (ToolContext, Arc<StaticAuthenticator>) {
        let auth = Arc::new(StaticAuthenticator {
            accept,
            calls: AtomicUsize::new(0),
        });
        let session = Arc::new(SessionManager::new(
            Credentials::new("acme", "u", "p"),
            auth.clone(),
            Duration::from_secs(60),
        ));
        let api = ApiClient::new(&UpstreamConfig::new("http://127.0.0.1:9")).unwrap();
        (ToolContext::new(session, api), auth)
    }

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        /// Text to echo back
        text: String,
        #[serde(default)]
        repeat: Option<u32>,
    }

    struct EchoRouter;

    impl DomainRouter for EchoRouter {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn tools(&self) -> Vec<ToolSpec> {
            vec![
                ToolSpec::new(
                    "echo",
                    "Echo the input text.",
                    &["echo", "read"],
                    |client: AuthorizedClient, args: EchoArgs| async move {
                        let repeat = args.repeat.unwrap_or(1) as usize;
                        Ok(json!({
                            "text": args.text.repeat(repeat),
                            "company": client.headers().company(),
                            "token": client.headers().token(),
                        }))
                    },
                ),
                ToolSpec::new(
                    "expired",
                    "Always answers 401.",
                    &["echo"],
                    |_client: AuthorizedClient, _args: EchoArgs| async move {
                        Err::<Value, _>(ApiError::Unauthorized("Token expired".to_string()))
                    },
                ),
            ]
        }
    }

    struct ClashingRouter;

    impl DomainRouter for ClashingRouter {
        fn name(&self) -> &'static str {
            "clash"
        }

        fn tools(&self) -> Vec<ToolSpec> {
            vec![ToolSpec::new(
                "echo",
                "Same name as EchoRouter's tool.",
                &[],
                |_client: AuthorizedClient, _args: EchoArgs| async move { Ok(Value::Null) },
            )]
        }
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[test]
    fn test_register_exposes_schema_and_tags() {
        let (ctx, _) = context(true);
        let mut registry = ToolRegistry::new(ctx);
        assert_eq!(registry.register(&EchoRouter).unwrap(), 2);

        assert_eq!(registry.tool_names(), vec!["echo", "expired"]);
        assert_eq!(registry.router_of("echo"), Some("echo"));
        assert_eq!(registry.tags("echo"), Some(&["echo", "read"][..]));
        assert_eq!(registry.tools_with_tag("read"), vec!["echo"]);

        let tool = registry.tool("echo").unwrap();
        assert_eq!(tool.description.as_deref(), Some("Echo the input text."));
        assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
        assert!(!tool.input_schema.contains_key("$schema"));
        let properties = tool.input_schema.get("properties").unwrap();
        assert!(properties.get("text").is_some());
        assert!(properties.get("repeat").is_some());
        assert_eq!(tool.input_schema.get("required"), Some(&json!(["text"])));
    }

    #[test]
    fn test_duplicate_tool_rejected_without_partial_registration() {
        let (ctx, _) = context(true);
        let mut registry = ToolRegistry::new(ctx);
        registry.register(&EchoRouter).unwrap();

        let err = registry.register(&ClashingRouter).unwrap_err();
        match err {
            ServerError::DuplicateTool {
                tool,
                router,
                existing,
            } => {
                assert_eq!(tool, "echo");
                assert_eq!(router, "clash");
                assert_eq!(existing, "echo");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_call_authenticates_once_and_wraps_result() {
        let (ctx, auth) = context(true);
        let mut registry = ToolRegistry::new(ctx);
        registry.register(&EchoRouter).unwrap();

        for _ in 0..3 {
            let envelope = registry
                .call("echo", args(json!({"text": "ab", "repeat": 2})))
                .await
                .unwrap();
            assert_eq!(
                envelope.to_value(),
                json!({
                    "success": true,
                    "result": {"text": "abab", "company": "acme", "token": "tok-1"}
                })
            );
        }
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_authentication() {
        let (ctx, auth) = context(true);
        let mut registry = ToolRegistry::new(ctx);
        registry.register(&EchoRouter).unwrap();

        let envelope = registry.call("echo", None).await.unwrap();
        assert!(!envelope.success);
        let error = envelope.error.unwrap();
        assert!(error.starts_with("Invalid arguments for echo:"), "{error}");
        assert!(error.contains("text"), "{error}");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_envelope() {
        let (ctx, auth) = context(false);
        let mut registry = ToolRegistry::new(ctx);
        registry.register(&EchoRouter).unwrap();

        let envelope = registry
            .call("echo", args(json!({"text": "x"})))
            .await
            .unwrap();
        assert_eq!(
            envelope,
            ToolEnvelope::failure(format!(
                "{} (Authentication rejected: bad password)",
                AUTH_FAILED_MESSAGE
            ))
        );
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_upstream_clears_session() {
        let (ctx, auth) = context(true);
        let session = Arc::clone(ctx.session());
        let mut registry = ToolRegistry::new(ctx);
        registry.register(&EchoRouter).unwrap();

        let envelope = registry
            .call("expired", args(json!({"text": "x"})))
            .await
            .unwrap();
        assert!(!envelope.success);
        assert!(envelope
            .error
            .unwrap()
            .starts_with("expired failed: SimplyBook rejected the session token"));
        assert!(!session.is_authenticated());

        registry
            .call("echo", args(json!({"text": "x"})))
            .await
            .unwrap();
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (ctx, _) = context(true);
        let registry = ToolRegistry::new(ctx);
        assert!(registry.call("nope", None).await.is_none());
    }
}
