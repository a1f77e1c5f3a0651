//! MCP tool surface: descriptors and dispatch into the gateway.
//!
//! Four tools are exposed. Refused requests and listing failures are
//! reported with `isError: true`; a Gradle build that ran and failed is a
//! normal result whose payload carries the reconstructed error, so the
//! agent can read the build output instead of a transport error.

use gmcp_common::listing;
use gmcp_common::progress::ProgressSink;
use gmcp_common::types::{CleanParams, ListTasksParams, RunTaskParams};
use schemars::schema_for;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::ServerContext;
use crate::rpc::{CallToolResult, ToolDescriptor};

pub const LIST_PROJECTS: &str = "list_projects";
pub const LIST_PROJECT_TASKS: &str = "list_project_tasks";
pub const RUN_TASK: &str = "run_task";
pub const CLEAN: &str = "clean";

/// Descriptors for every tool the server advertises.
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: LIST_PROJECTS,
            description: "List all Gradle projects in the workspace.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDescriptor {
            name: LIST_PROJECT_TASKS,
            description: "List all tasks available in a Gradle project.",
            input_schema: schema(schema_for!(ListTasksParams)),
        },
        ToolDescriptor {
            name: RUN_TASK,
            description: "Run a Gradle task. This tool cannot run cleaning tasks \
                          (clean, cleanBuild, etc.). Use the `clean` tool for cleaning \
                          tasks instead.",
            input_schema: schema(schema_for!(RunTaskParams)),
        },
        ToolDescriptor {
            name: CLEAN,
            description: "Clean build artifacts for a Gradle project. This is the only \
                          tool that should be used for cleaning tasks.",
            input_schema: schema(schema_for!(CleanParams)),
        },
    ]
}

fn schema(root: schemars::schema::RootSchema) -> Value {
    serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}))
}

/// Execute one tool call.
///
/// Returns `None` for a tool name the server never advertised; the
/// transport answers that with an invalid-params error. Every other
/// failure mode is folded into the returned result.
pub async fn call_tool(
    context: &ServerContext,
    name: &str,
    arguments: Value,
    sink: Arc<dyn ProgressSink>,
) -> Option<CallToolResult> {
    debug!(tool = name, "dispatching tool call");
    let result = match name {
        LIST_PROJECTS => list_projects(context).await,
        LIST_PROJECT_TASKS => list_project_tasks(context, arguments).await,
        RUN_TASK => run_task(context, arguments, sink).await,
        CLEAN => clean(context, arguments, sink).await,
        _ => return None,
    };
    Some(result)
}

async fn list_projects(context: &ServerContext) -> CallToolResult {
    match listing::list_projects(&context.wrapper, &context.project_root).await {
        Ok(projects) => json_result(&projects),
        Err(e) => CallToolResult::error(format!("{e:#}")),
    }
}

async fn list_project_tasks(context: &ServerContext, arguments: Value) -> CallToolResult {
    let params: ListTasksParams = match serde_json::from_value(arguments) {
        Ok(params) => params,
        Err(e) => return CallToolResult::error(format!("Invalid arguments: {e}")),
    };
    match listing::list_tasks(
        &context.wrapper,
        &context.project_root,
        params.project.as_deref(),
    )
    .await
    {
        Ok(tasks) => json_result(&tasks),
        Err(e) => CallToolResult::error(format!("{e:#}")),
    }
}

async fn run_task(
    context: &ServerContext,
    arguments: Value,
    sink: Arc<dyn ProgressSink>,
) -> CallToolResult {
    let params: RunTaskParams = match serde_json::from_value(arguments) {
        Ok(params) => params,
        Err(e) => return CallToolResult::error(format!("Invalid arguments: {e}")),
    };
    match context
        .gateway
        .run_task(&params.task, &params.args, sink)
        .await
    {
        Ok(result) => json_result(&result),
        Err(rejection) => CallToolResult::error(rejection.to_string()),
    }
}

async fn clean(
    context: &ServerContext,
    arguments: Value,
    sink: Arc<dyn ProgressSink>,
) -> CallToolResult {
    let params: CleanParams = match serde_json::from_value(arguments) {
        Ok(params) => params,
        Err(e) => return CallToolResult::error(format!("Invalid arguments: {e}")),
    };
    let result = context.gateway.clean(params.project.as_deref(), sink).await;
    json_result(&result)
}

/// Pretty-printed JSON payload as the single text content block.
fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error(format!("Failed to serialize result: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmcp_common::gateway::TaskGateway;
    use gmcp_common::progress::NullSink;
    use std::path::PathBuf;

    fn context_with(wrapper: PathBuf, root: PathBuf) -> ServerContext {
        ServerContext {
            gateway: TaskGateway::new(wrapper.clone(), root.clone()),
            wrapper,
            project_root: root,
        }
    }

    /// Parse the single text block of a result back into JSON.
    fn payload(result: &CallToolResult) -> Value {
        serde_json::from_str(&result.content[0].text).expect("payload should be JSON")
    }

    #[test]
    fn test_descriptors_cover_all_tools() {
        let descriptors = descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name).collect();

        assert_eq!(
            names,
            vec!["list_projects", "list_project_tasks", "run_task", "clean"]
        );
        assert!(descriptors.iter().all(|d| !d.description.is_empty()));
    }

    #[test]
    fn test_run_task_schema_requires_task() {
        let descriptors = descriptors();
        let run_task = descriptors.iter().find(|d| d.name == RUN_TASK).unwrap();

        let schema = &run_task.input_schema;
        assert!(schema["properties"]["task"].is_object());
        assert!(schema["properties"]["args"].is_object());
        assert!(
            schema["required"]
                .as_array()
                .unwrap()
                .contains(&json!("task"))
        );
    }

    #[test]
    fn test_steering_descriptions_point_at_clean_tool() {
        let descriptors = descriptors();
        let run_task = descriptors.iter().find(|d| d.name == RUN_TASK).unwrap();
        let clean = descriptors.iter().find(|d| d.name == CLEAN).unwrap();

        assert!(run_task.description.contains("cannot run cleaning tasks"));
        assert!(clean.description.contains("only"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_dispatched() {
        let context = context_with(PathBuf::from("gradlew"), PathBuf::from("."));
        let result = call_tool(&context, "frobnicate", json!({}), Arc::new(NullSink)).await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_run_task_missing_task_argument() {
        let context = context_with(PathBuf::from("gradlew"), PathBuf::from("."));
        let result = call_tool(&context, RUN_TASK, json!({}), Arc::new(NullSink))
            .await
            .expect("known tool");

        assert!(result.is_error);
        assert!(result.content[0].text.contains("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_run_task_policy_rejection_is_an_error_result() {
        let context = context_with(PathBuf::from("gradlew"), PathBuf::from("."));
        let result = call_tool(
            &context,
            RUN_TASK,
            json!({"task": "build", "args": ["--init-script", "evil.gradle"]}),
            Arc::new(NullSink),
        )
        .await
        .expect("known tool");

        assert!(result.is_error);
        assert!(
            result.content[0]
                .text
                .contains("not allowed due to security concerns")
        );
    }

    #[tokio::test]
    async fn test_run_task_cleaning_rejection_is_an_error_result() {
        let context = context_with(PathBuf::from("gradlew"), PathBuf::from("."));
        let result = call_tool(
            &context,
            RUN_TASK,
            json!({"task": "clean"}),
            Arc::new(NullSink),
        )
        .await
        .expect("known tool");

        assert!(result.is_error);
        assert!(result.content[0].text.contains("use the clean tool instead"));
    }

    #[cfg(unix)]
    mod with_scripts {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn fake_gradlew(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("gradlew");
            std::fs::write(&path, body).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        #[tokio::test]
        async fn test_failing_build_is_not_a_protocol_error() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_gradlew(
                dir.path(),
                "#!/bin/sh\necho '> Task :app:test FAILED'\nexit 1\n",
            );
            let context = context_with(script, dir.path().to_path_buf());

            let result = call_tool(
                &context,
                RUN_TASK,
                json!({"task": "test"}),
                Arc::new(NullSink),
            )
            .await
            .expect("known tool");

            // The invocation worked; only the build failed.
            assert!(!result.is_error);
            let body = payload(&result);
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().contains(":app:test FAILED"));
        }

        #[tokio::test]
        async fn test_successful_build_payload() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_gradlew(dir.path(), "#!/bin/sh\necho 'BUILD SUCCESSFUL in 1s'\n");
            let context = context_with(script, dir.path().to_path_buf());

            let result = call_tool(
                &context,
                RUN_TASK,
                json!({"task": "build"}),
                Arc::new(NullSink),
            )
            .await
            .expect("known tool");

            assert!(!result.is_error);
            let body = payload(&result);
            assert_eq!(body["success"], true);
            assert_eq!(body["error"], Value::Null);
            assert!(body["stdout"].as_str().unwrap().contains("BUILD SUCCESSFUL"));
        }

        #[tokio::test]
        async fn test_clean_scopes_to_requested_project() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_gradlew(dir.path(), "#!/bin/sh\necho \"$@\"\n");
            let context = context_with(script, dir.path().to_path_buf());

            let result = call_tool(
                &context,
                CLEAN,
                json!({"project": ":app"}),
                Arc::new(NullSink),
            )
            .await
            .expect("known tool");

            assert!(!result.is_error);
            let body = payload(&result);
            assert!(
                body["stdout"]
                    .as_str()
                    .unwrap()
                    .contains(":app:clean --no-build-cache")
            );
        }

        #[tokio::test]
        async fn test_listing_failure_is_an_error_result() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_gradlew(
                dir.path(),
                "#!/bin/sh\necho 'Could not determine the dependencies' >&2\nexit 1\n",
            );
            let context = context_with(script, dir.path().to_path_buf());

            let result = call_tool(&context, LIST_PROJECTS, json!({}), Arc::new(NullSink))
                .await
                .expect("known tool");

            assert!(result.is_error);
            assert!(result.content[0].text.contains("Failed to list projects"));
        }

        #[tokio::test]
        async fn test_list_project_tasks_returns_parsed_tasks() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_gradlew(
                dir.path(),
                "#!/bin/sh\necho 'Build tasks'\necho '-----------'\necho 'assemble - Assembles the outputs.'\n",
            );
            let context = context_with(script, dir.path().to_path_buf());

            let result = call_tool(
                &context,
                LIST_PROJECT_TASKS,
                json!({"project": ":app"}),
                Arc::new(NullSink),
            )
            .await
            .expect("known tool");

            assert!(!result.is_error);
            let body = payload(&result);
            assert_eq!(body[0]["name"], "assemble");
            assert_eq!(body[0]["project"], ":app");
            assert_eq!(body[0]["group"], "Build");
        }
    }
}
