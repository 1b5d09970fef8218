use colored::*;
use jiff::civil::Date;

use crate::{
    graph::DecodeError,
    models::{
        EntityId,
        project::{Project, ProjectTask},
        snapshot::Violation,
        task::{Task, TaskStatus},
        user::User,
    },
    services::tasks::TaskContext,
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the glyph for a task status
pub fn get_status_glyph(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::ToDo => "○".normal(),
        TaskStatus::InProgress => "◐".yellow(),
        TaskStatus::Done => "✓".dimmed(),
    }
}

/// Build the context string for a task: `{Project} / {Assignee}`
/// Returns None if neither name is known
pub fn get_task_context(task: &Task, context: TaskContext<'_>) -> Option<String> {
    match (context.project_name(task), context.assignee_name(task)) {
        (Some(project), Some(user)) => Some(format!("{} / {}", project, user)),
        (Some(project), None) => Some(project.to_string()),
        (None, Some(user)) => Some(user.to_string()),
        (None, None) => None,
    }
}

/// Format a project's date range (e.g., "Jan 01, 2024 → Jun 30, 2024")
pub fn format_date_range(start: Date, end: Option<Date>) -> String {
    let start = start.strftime("%b %d, %Y").to_string();
    match end {
        Some(end) => format!("{} → {}", start, end.strftime("%b %d, %Y")),
        None => format!("{} → open", start),
    }
}

/// Print a line with the left part styled and `right` dimmed against the
/// right edge of the terminal
fn render_aligned(left: &str, styled_left: ColoredString, right: Option<String>) {
    let Some(right) = right.filter(|r| !r.is_empty()) else {
        println!("{}", styled_left);
        return;
    };

    let terminal_width = get_terminal_width();
    let total_content = left.chars().count() + right.chars().count();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), right.dimmed());
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}", styled_left);
    }
}

/// Render a single task line with ID, glyph, name, and right-aligned context
pub fn render_task_line(task: &Task, context: TaskContext<'_>) {
    let id_str = format!("{:>3}", task.id);
    let left_section = format!("  {}  {}  {}", id_str, " ", task.name);
    let line = format!("  {}  {}  {}", id_str, get_status_glyph(task.status), task.name);

    let styled_left = if task.status == TaskStatus::Done {
        line.dimmed()
    } else {
        line.bold()
    };

    render_aligned(&left_section, styled_left, get_task_context(task, context));
}

fn render_project_task(task: &ProjectTask) {
    let line = format!("        {}  {}", get_status_glyph(task.status), task.name);
    let plain = format!("        {}  {}", " ", task.name);
    let styled = if task.status == TaskStatus::Done {
        line.dimmed()
    } else {
        line.normal()
    };
    render_aligned(&plain, styled, task.assigned_to.clone());
}

/// Render a project with its dates and the tasks the remote attached to it
pub fn render_project_line(project: &Project) {
    let left_section = format!("  {:>3}  {}", project.id, project.name);
    let styled_left = if project.has_valid_dates() {
        left_section.bold()
    } else {
        left_section.red().bold()
    };
    render_aligned(
        &left_section,
        styled_left,
        Some(format_date_range(project.start_date, project.end_date)),
    );

    if let Some(description) = &project.description {
        println!("        {}", description.italic());
    }
    for task in &project.tasks {
        render_project_task(task);
    }
}

/// Render a user with role and email on the right
pub fn render_user_line(user: &User) {
    let left_section = format!("  {:>3}  {}", user.id, user.name);
    let right = format!("{}  ·  {}", user.role, user.email);
    render_aligned(&left_section, left_section.bold(), Some(right));
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize, noun: &str) {
    let word = if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, word);
}

/// Render a section header (e.g., "Violations")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Render a message shown in place of a list
pub fn render_notice(message: &str) {
    println!("{}", message.dimmed());
}

/// Render the records a name could have matched (e.g., "Available projects: #1 Apollo")
pub fn render_choices(entity: &str, choices: &[(EntityId, &str)]) {
    if choices.is_empty() {
        return;
    }
    let listed: Vec<String> = choices
        .iter()
        .map(|(id, name)| format!("#{} {}", id, name))
        .collect();
    eprintln!("  {}", format!("Available {}s: {}", entity, listed.join(", ")).dimmed());
}

pub fn render_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Render references the last load had to drop
pub fn render_issues(issues: &[DecodeError]) {
    for issue in issues {
        eprintln!("{} {}", "Warning:".yellow().bold(), issue);
    }
}

pub fn render_violations(violations: &[Violation]) {
    for violation in violations {
        println!("  {} {}", "●".red(), violation);
    }
}
