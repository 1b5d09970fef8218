use std::io::Write;

use clap::{Args, Parser, Subcommand};
use colored::*;
use thiserror::Error;

use pmt::{
    config::{self, Config, Overrides},
    graph::{DecodeOptions, UnknownFields},
    logging,
    models::{EntityId, snapshot::Snapshot, task::TaskStatus},
    remote::{Remote, http::HttpRemote},
    services::{
        LookupError, Service,
        projects::{ProjectForm, Projects},
        tasks::{TaskContext, TaskForm, Tasks},
        users::{UserForm, Users},
    },
    sync::{Confirmation, Controller, FetchError, MutationError, RemoveOutcome, SubmitError},
    ui,
};

#[derive(Parser)]
#[command(
    name = "pmt",
    about = "Keep projects, tasks and users in sync with a project management API"
)]
struct Cli {
    /// Base URL of the API (e.g., "http://localhost:5000/api")
    #[arg(long, global = true, env = config::API_URL_ENV)]
    api_url: Option<String>,

    /// Seconds to wait for the API before giving up
    #[arg(long, global = true, env = config::TIMEOUT_ENV)]
    timeout: Option<u64>,

    /// Log requests and reloads to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fail a load when the API refers to an object it never sent
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Load every list and report broken relationships
    Check,
}

#[derive(Debug, Subcommand)]
enum ProjectCommands {
    /// List all projects with their tasks
    List,
    /// Create a new project
    New(ProjectArgs),
    /// Change a project
    Edit {
        id: EntityId,
        #[command(flatten)]
        fields: ProjectArgs,
    },
    /// Delete a project and its tasks
    Delete {
        id: EntityId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TaskCommands {
    /// List all tasks
    List,
    /// Create a new task
    New(TaskArgs),
    /// Change a task
    Edit {
        id: EntityId,
        #[command(flatten)]
        fields: TaskArgs,
    },
    /// Delete a task
    Delete {
        id: EntityId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommands {
    /// List all users
    List,
    /// Create a new user
    New(UserArgs),
    /// Change a user
    Edit {
        id: EntityId,
        #[command(flatten)]
        fields: UserArgs,
    },
    /// Delete a user; their tasks become unassigned
    Delete {
        id: EntityId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Args)]
struct ProjectArgs {
    /// Project name
    #[arg(short, long)]
    name: Option<String>,

    /// Add a description
    #[arg(short, long)]
    description: Option<String>,

    /// Start date (e.g., "2025-03-01")
    #[arg(short, long)]
    start: Option<String>,

    /// End date (e.g., "2025-06-30"); pass "" to clear it
    #[arg(short, long)]
    end: Option<String>,
}

impl ProjectArgs {
    fn apply(self, form: &mut ProjectForm) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(start) = self.start {
            form.start_date = start;
        }
        if let Some(end) = self.end {
            form.end_date = end;
        }
    }
}

#[derive(Debug, Args)]
struct TaskArgs {
    /// Task name
    #[arg(short, long)]
    name: Option<String>,

    /// Add a description
    #[arg(short, long)]
    description: Option<String>,

    /// ToDo, InProgress or Done
    #[arg(short, long)]
    status: Option<TaskStatus>,

    /// Project id or name
    #[arg(short, long)]
    project: Option<String>,

    /// Assign to a user (id or name)
    #[arg(short, long, conflicts_with = "unassign")]
    assign: Option<String>,

    /// Remove the current assignee
    #[arg(long)]
    unassign: bool,
}

impl TaskArgs {
    fn apply(self, form: &mut TaskForm, context: TaskContext<'_>) -> Result<(), LookupError> {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(status) = self.status {
            form.status = Some(status);
        }
        if let Some(project) = self.project {
            form.project_id = Some(context.resolve_project(&project)?);
        }
        if self.unassign {
            form.assigned_to_id = None;
        } else if let Some(user) = self.assign {
            form.assigned_to_id = Some(context.resolve_user(&user)?);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct UserArgs {
    /// Full name
    #[arg(short, long)]
    name: Option<String>,

    /// Contact address
    #[arg(short, long)]
    email: Option<String>,

    /// Role label (e.g., "Developer")
    #[arg(short, long)]
    role: Option<String>,
}

impl UserArgs {
    fn apply(self, form: &mut UserForm) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(email) = self.email {
            form.email = email;
        }
        if let Some(role) = self.role {
            form.role = role;
        }
    }
}

#[derive(Error, Debug)]
enum CommandError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("No {entity} with id {id}")]
    UnknownId { entity: &'static str, id: EntityId },

    #[error("Failed to read confirmation: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("Found {0} broken relationship(s)")]
    Violations(usize),
}

fn confirm(question: &str) -> Result<Confirmation, CommandError> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let confirmed = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
    Ok(Confirmation::from(confirmed))
}

/// Everything a command needs to build controllers
#[derive(Clone, Copy)]
struct Session<'r> {
    remote: &'r dyn Remote,
    options: DecodeOptions,
}

impl<'r> Session<'r> {
    fn controller<S: Service>(self) -> Controller<'r, S> {
        Controller::with_options(self.remote, self.options)
    }

    fn load<S: Service>(self) -> Result<Controller<'r, S>, CommandError> {
        let mut controller = self.controller::<S>();
        controller.load()?;
        ui::render_issues(controller.issues());
        Ok(controller)
    }

    fn create<S: Service>(self, form: S::Form) -> Result<(), CommandError> {
        self.controller::<S>().submit(form)?;
        println!("{} Created {}", "✓".green(), S::LABEL);
        Ok(())
    }

    /// Loads the list, starts editing `id` and submits the form once
    /// `overlay` has applied the requested changes.
    fn edit<S: Service>(
        self,
        id: EntityId,
        overlay: impl FnOnce(&mut S::Form) -> Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        let mut controller = self.load::<S>()?;
        let entity = controller
            .find(id)
            .cloned()
            .ok_or(CommandError::UnknownId {
                entity: S::LABEL,
                id,
            })?;
        controller.begin_edit(&entity);

        let mut form = controller.form().clone();
        overlay(&mut form)?;
        controller.submit(form)?;
        println!("{} Updated {} #{}", "✓".green(), S::LABEL, id);
        Ok(())
    }

    fn delete<S: Service>(self, id: EntityId, yes: bool) -> Result<(), CommandError> {
        let confirmation = if yes {
            Confirmation::Confirmed
        } else {
            confirm(&format!("Are you sure you want to delete this {}?", S::LABEL))?
        };

        match self.controller::<S>().remove(id, confirmation)? {
            RemoveOutcome::Removed => println!("{} Deleted {} #{}", "✓".green(), S::LABEL, id),
            RemoveOutcome::Declined => println!("Nothing deleted"),
        }
        Ok(())
    }

    /// Projects and users, as the task commands need them.
    fn task_lists(self) -> Result<(Controller<'r, Projects>, Controller<'r, Users>), CommandError> {
        Ok((self.load::<Projects>()?, self.load::<Users>()?))
    }
}

/// Renders the list, or the notice shown in its place.
fn render_list<S: Service>(controller: &Controller<'_, S>, title: &str, render: impl Fn(&S::Entity)) {
    if let Some(notice) = controller.notice() {
        ui::render_notice(&notice);
        return;
    }
    ui::render_view_header(title, controller.entities().len(), S::LABEL);
    for entity in controller.entities() {
        render(entity);
    }
}

/// Lists what could have been picked when a name did not match anything.
fn show_choices(context: TaskContext<'_>, error: &LookupError) {
    if let LookupError::NotFound { entity, .. } = error {
        let choices: Vec<_> = match *entity {
            "project" => context.project_choices().collect(),
            _ => context.user_choices().collect(),
        };
        ui::render_choices(entity, &choices);
    }
}

fn run_project(session: Session<'_>, command: ProjectCommands) -> Result<(), CommandError> {
    match command {
        ProjectCommands::List => {
            let projects = session.load::<Projects>()?;
            render_list(&projects, "Projects", ui::render_project_line);
        }
        ProjectCommands::New(fields) => {
            let mut form = ProjectForm::default();
            fields.apply(&mut form);
            session.create::<Projects>(form)?;
        }
        ProjectCommands::Edit { id, fields } => {
            session.edit::<Projects>(id, |form| {
                fields.apply(form);
                Ok(())
            })?;
        }
        ProjectCommands::Delete { id, yes } => session.delete::<Projects>(id, yes)?,
    }
    Ok(())
}

fn run_task(session: Session<'_>, command: TaskCommands) -> Result<(), CommandError> {
    match command {
        TaskCommands::List => {
            let tasks = session.load::<Tasks>()?;
            // Names fall back to what the task payload embeds
            let mut projects = session.controller::<Projects>();
            let mut users = session.controller::<Users>();
            let _ = projects.load();
            let _ = users.load();

            let context = TaskContext::new(projects.entities(), users.entities());
            render_list(&tasks, "Tasks", |task| ui::render_task_line(task, context));
        }
        TaskCommands::New(fields) => {
            let (projects, users) = session.task_lists()?;
            let context = TaskContext::new(projects.entities(), users.entities());

            let mut form = TaskForm::default();
            fields
                .apply(&mut form, context)
                .inspect_err(|e| show_choices(context, e))?;
            if form.project_id.is_none() {
                let choices: Vec<_> = context.project_choices().collect();
                ui::render_choices("project", &choices);
            }
            session.create::<Tasks>(form)?;
        }
        TaskCommands::Edit { id, fields } => {
            let (projects, users) = session.task_lists()?;
            let context = TaskContext::new(projects.entities(), users.entities());

            session.edit::<Tasks>(id, |form| {
                fields
                    .apply(form, context)
                    .inspect_err(|e| show_choices(context, e))?;
                Ok(())
            })?;
        }
        TaskCommands::Delete { id, yes } => session.delete::<Tasks>(id, yes)?,
    }
    Ok(())
}

fn run_user(session: Session<'_>, command: UserCommands) -> Result<(), CommandError> {
    match command {
        UserCommands::List => {
            let users = session.load::<Users>()?;
            render_list(&users, "Users", ui::render_user_line);
        }
        UserCommands::New(fields) => {
            let mut form = UserForm::default();
            fields.apply(&mut form);
            session.create::<Users>(form)?;
        }
        UserCommands::Edit { id, fields } => {
            session.edit::<Users>(id, |form| {
                fields.apply(form);
                Ok(())
            })?;
        }
        UserCommands::Delete { id, yes } => session.delete::<Users>(id, yes)?,
    }
    Ok(())
}

fn run_check(session: Session<'_>) -> Result<(), CommandError> {
    let projects = session.load::<Projects>()?;
    let tasks = session.load::<Tasks>()?;
    let users = session.load::<Users>()?;

    let violations =
        Snapshot::new(projects.entities(), tasks.entities(), users.entities()).violations();
    println!(
        "{} projects, {} tasks, {} users",
        projects.entities().len(),
        tasks.entities().len(),
        users.entities().len()
    );

    if violations.is_empty() {
        println!("{} No broken relationships", "✓".green());
        return Ok(());
    }
    ui::render_section_header("Violations");
    ui::render_violations(&violations);
    Err(CommandError::Violations(violations.len()))
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let overrides = Overrides {
        api_url: cli.api_url,
        timeout_secs: cli.timeout,
    };
    let config = match Config::load(config::default_path().as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            ui::render_error(&e.to_string());
            std::process::exit(1);
        }
    };
    let remote = HttpRemote::new(&config.api_url, config.timeout);
    tracing::debug!(api_url = %remote.base_url(), timeout = ?config.timeout, "Using API");
    let session = Session {
        remote: &remote,
        options: DecodeOptions {
            unknown_fields: UnknownFields::Drop,
            strict_references: cli.strict,
        },
    };

    let result = match cli.command {
        Commands::Project(command) => run_project(session, command),
        Commands::Task(command) => run_task(session, command),
        Commands::User(command) => run_user(session, command),
        Commands::Check => run_check(session),
    };

    if let Err(e) = result {
        ui::render_error(&e.to_string());
        std::process::exit(1);
    }
}
