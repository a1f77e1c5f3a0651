//! Project and task discovery via Gradle's own reports.
//!
//! `gradlew projects` and `gradlew tasks --all` are the only commands the
//! server runs without being asked to execute anything, so they are
//! captured in one shot rather than streamed. Parsing is split into pure
//! functions over the captured report text so the line formats can be
//! tested without a Gradle installation.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::types::{ProjectInfo, TaskInfo};

/// Canonical name of the root project.
pub const ROOT_PROJECT: &str = ":";

// ── Projects ─────────────────────────────────────────────────────────────

/// List all projects in the workspace via `gradlew projects -q`.
pub async fn list_projects(wrapper: &Path, project_root: &Path) -> Result<Vec<ProjectInfo>> {
    let output = Command::new(wrapper)
        .args(["projects", "-q"])
        .current_dir(project_root)
        .output()
        .await
        .context("Failed to execute gradle projects")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Failed to list projects: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let projects = parse_projects_output(&stdout, project_root)?;
    debug!(count = projects.len(), "parsed project report");
    Ok(projects)
}

/// Parse the `projects` report into project records.
///
/// The root project is emitted once under the name `":"`; subprojects keep
/// their path notation. Both report styles (`+--- Project ':app'` tree
/// lines and bare `Project ':app'` lines) are recognized.
pub fn parse_projects_output(output: &str, project_root: &Path) -> Result<Vec<ProjectInfo>> {
    let project_re = Regex::new(r"Project '([^']+)'").context("Failed to compile project regex")?;

    let mut projects = Vec::new();
    let mut root_added = false;

    for line in output.lines() {
        let line = line.trim();

        if line.contains("Root project") && !root_added {
            projects.push(ProjectInfo {
                name: ROOT_PROJECT.to_string(),
                path: project_root.display().to_string(),
                description: Some("Root project".to_string()),
            });
            root_added = true;
            continue;
        }

        if line.contains("Project '")
            && !line.contains("Root project")
            && let Some(captures) = project_re.captures(line)
        {
            let name = &captures[1];
            if name != ROOT_PROJECT {
                projects.push(ProjectInfo {
                    name: name.to_string(),
                    path: project_root.display().to_string(),
                    description: None,
                });
            }
        }
    }

    Ok(projects)
}

// ── Tasks ────────────────────────────────────────────────────────────────

/// List the tasks of one project via `gradlew [project:]tasks --all`.
///
/// `None`, `""` and `":"` all select the root project.
pub async fn list_tasks(
    wrapper: &Path,
    project_root: &Path,
    project: Option<&str>,
) -> Result<Vec<TaskInfo>> {
    let project = normalize_project(project);
    let task_cmd = if project == ROOT_PROJECT {
        "tasks".to_string()
    } else {
        format!("{project}:tasks")
    };

    let output = Command::new(wrapper)
        .args([task_cmd.as_str(), "--all"])
        .current_dir(project_root)
        .output()
        .await
        .context("Failed to execute gradle tasks")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "Failed to list tasks for project {}: {}",
            project,
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let tasks = parse_tasks_output(&stdout, &project)?;
    debug!(project = %project, count = tasks.len(), "parsed task report");
    Ok(tasks)
}

/// Canonical project name: the root is always `":"`.
#[must_use]
pub fn normalize_project(project: Option<&str>) -> String {
    match project {
        None | Some("") => ROOT_PROJECT.to_string(),
        Some(project) => project.to_string(),
    }
}

/// Parse the `tasks --all` report into task records.
///
/// A section header is a line underlined with dashes; only `<Group> tasks`
/// headers open a task section, so footers like `Rules` end collection of
/// the preceding group. Tasks appear as `name - description` or as a bare
/// name, and parsing stops at the trailing help text.
pub fn parse_tasks_output(output: &str, project: &str) -> Result<Vec<TaskInfo>> {
    let described_re =
        Regex::new(r"^(\w+)\s+-\s+(.+)$").context("Failed to compile task regex")?;
    let bare_re = Regex::new(r"^(\w+)$").context("Failed to compile bare task regex")?;

    let lines: Vec<&str> = output.lines().map(str::trim).collect();

    let mut tasks = Vec::new();
    let mut in_task_section = false;
    let mut current_group: Option<String> = None;

    for (i, &line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }

        if is_underlined(&lines, i) {
            match line.strip_suffix(" tasks") {
                Some(group) if line.starts_with(|c: char| c.is_uppercase()) => {
                    in_task_section = true;
                    current_group = Some(group.trim().to_string());
                }
                _ => {
                    in_task_section = false;
                    current_group = None;
                }
            }
            continue;
        }

        // Header underlines and rule patterns carry no tasks.
        if line.starts_with('-') || line.contains("Pattern:") {
            continue;
        }

        if line.contains("To see all tasks") || line.starts_with("BUILD") {
            break;
        }

        if !in_task_section {
            continue;
        }

        if let Some(captures) = described_re.captures(line) {
            tasks.push(TaskInfo {
                name: captures[1].to_string(),
                project: project.to_string(),
                description: Some(captures[2].to_string()),
                group: current_group.clone(),
            });
        } else if bare_re.is_match(line) {
            tasks.push(TaskInfo {
                name: line.to_string(),
                project: project.to_string(),
                description: None,
                group: current_group.clone(),
            });
        }
    }

    Ok(tasks)
}

/// True when the line at `i` is followed by a dashes-only underline.
fn is_underlined(lines: &[&str], i: usize) -> bool {
    lines
        .get(i + 1)
        .is_some_and(|next| !next.is_empty() && next.bytes().all(|b| b == b'-'))
}
