//! Command-line interface for dayplan
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::{self, GuardDecision, LOGIN_ROUTE};
use crate::lock::FileLock;
use crate::mail::Mailer;
use crate::model::DayKey;
use crate::output::OutputOptions;
use crate::storage::{Storage, SESSION_SLOT};
use crate::store::Outcome;

mod auth;
mod task;
mod topic;
mod view;

/// dayplan - personal day planner
///
/// Dated tasks in quarter-hour slots, topic backlogs that can be promoted
/// into the daily plan, and daily/weekly/monthly views.
#[derive(Parser, Debug)]
#[command(name = "dayplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to config, then the platform data dir)
    #[arg(long, global = true, env = "DAYPLAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to ./.dayplan.toml when present)
    #[arg(long, global = true, env = "DAYPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override today's date (YYYY-MM-DD)
    #[arg(long, global = true, env = "DAYPLAN_TODAY")]
    pub today: Option<NaiveDate>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dated tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Topic backlogs
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Daily, weekly and monthly views
    #[command(subcommand)]
    View(ViewCommands),

    /// List the schedulable time slots
    Slots,

    /// Registration, verification and login
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Evaluate the route guard for a path
    Guard {
        /// Route path, e.g. /weekly or /login
        path: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        title: String,

        /// Day as DD.MM (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Start time as HH:MM
        #[arg(long, default_value = "09:00")]
        time: String,

        /// school-lesson, software, test-prep or english
        #[arg(long = "type", default_value = "school-lesson")]
        task_type: String,

        #[arg(long)]
        description: Option<String>,

        /// Days of month the task repeats on, e.g. 1,15
        #[arg(long, value_delimiter = ',')]
        recurring_days: Vec<u32>,

        /// Send a reminder to this address
        #[arg(long)]
        notify: Option<String>,
    },

    /// List tasks
    List {
        /// Only tasks on this day (DD.MM)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Show one task
    Show { id: String },

    /// Change task fields
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        time: Option<String>,

        #[arg(long = "type")]
        task_type: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long, value_delimiter = ',')]
        recurring_days: Option<Vec<u32>>,

        /// Stop repeating
        #[arg(long, conflicts_with = "recurring_days")]
        no_recurring: bool,

        #[arg(long)]
        notify: Option<String>,

        /// Turn reminders off
        #[arg(long, conflicts_with = "notify")]
        no_notify: bool,
    },

    /// Mark a task completed
    Done { id: String },

    /// Mark a task failed
    Fail { id: String },

    /// Delete a task
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TopicCommands {
    /// Create a topic
    Add { title: String },

    /// Delete a topic and its backlog
    Rm { id: String },

    /// List topics with their backlog
    List,

    /// Backlog items inside a topic
    #[command(subcommand)]
    Task(TopicTaskCommands),
}

#[derive(Subcommand, Debug)]
pub enum TopicTaskCommands {
    /// Add a backlog item
    Add {
        topic: String,
        title: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Change a backlog item
    Update {
        topic: String,
        task: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Mark a backlog item completed
    Done { topic: String, task: String },

    /// Mark a backlog item failed
    Fail { topic: String, task: String },

    /// Delete a backlog item
    Rm { topic: String, task: String },

    /// Schedule a backlog item as a dated task
    Promote {
        topic: String,
        task: String,

        /// Day as DD.MM (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// One of the slot times, e.g. 02:15
        #[arg(long)]
        time: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// Tasks for one day
    Daily { date: Option<String> },

    /// One day's tasks bucketed into time slots
    Slots { date: Option<String> },

    /// The week containing a day
    Weekly { date: Option<String> },

    /// Per-day completion for a month
    Monthly {
        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Status, type and per-day statistics for a month
    Stats {
        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create an account and send the verification mail
    Register {
        name: String,
        email: String,

        #[arg(long, env = "DAYPLAN_PASSWORD")]
        password: String,

        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Confirm an email address with its token
    Verify { token: String },

    /// Start a session
    Login {
        email: String,

        #[arg(long, env = "DAYPLAN_PASSWORD")]
        password: String,
    },

    /// End the session
    Logout,

    /// Show the current session
    Whoami,
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub today: Option<NaiveDate>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

/// Resolved configuration, storage and clock for one invocation.
///
/// Holds the data-directory lock until dropped.
pub(crate) struct Context {
    pub storage: Storage,
    pub config: Config,
    pub today: NaiveDate,
    pub output: OutputOptions,
    _lock: FileLock,
}

impl Context {
    pub fn load(global: &GlobalOptions) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::resolve(global.config.as_deref(), &cwd)?;
        let storage = Storage::new(config.data_dir(global.data_dir.as_deref()));
        let lock = storage.lock(config.storage.lock_timeout_ms)?;
        tracing::debug!(data_dir = %storage.data_dir().display(), "context loaded");

        Ok(Self {
            storage,
            today: global.today.unwrap_or_else(|| Local::now().date_naive()),
            output: global.output(),
            config,
            _lock: lock,
        })
    }

    pub fn today_key(&self) -> DayKey {
        DayKey::from_date(self.today)
    }

    /// `DD.MM` argument, or today when absent.
    pub fn day_or_today(&self, raw: Option<&str>) -> Result<DayKey> {
        match raw {
            Some(raw) => raw.parse(),
            None => Ok(self.today_key()),
        }
    }

    pub fn mailer(&self) -> Mailer {
        Mailer::spool(self.config.mail.clone(), self.storage.outbox_file())
    }

    /// Run the route guard for a protected command.
    pub fn require_session(&self, route: &str) -> Result<()> {
        if !self.config.auth.require_login {
            return Ok(());
        }
        let has_session = self.storage.has_slot(SESSION_SLOT);
        match guard::check(route, has_session, self.today_key()) {
            GuardDecision::Redirect { location } if location == LOGIN_ROUTE => {
                Err(Error::NotAuthenticated)
            }
            _ => Ok(()),
        }
    }
}

/// What a dispatched action was aimed at, for error reporting.
pub(crate) enum Target<'a> {
    Task(&'a str),
    Topic(&'a str),
    TopicTask {
        topic_id: &'a str,
        task_id: &'a str,
        title: &'a str,
    },
}

/// Map a rejected reducer outcome onto the matching CLI error.
pub(crate) fn ensure_applied(outcome: Outcome, target: Target<'_>) -> Result<()> {
    match (outcome, target) {
        (Outcome::Applied, _) => Ok(()),
        (Outcome::Invalid { reason }, _) => Err(Error::InvalidArgument(reason)),
        (Outcome::NotFound, Target::Task(id)) => Err(Error::TaskNotFound(id.to_string())),
        (Outcome::NotFound, Target::Topic(id)) => Err(Error::TopicNotFound(id.to_string())),
        (Outcome::NotFound, Target::TopicTask { topic_id, task_id, .. }) => {
            Err(Error::TopicTaskNotFound {
                topic_id: topic_id.to_string(),
                task_id: task_id.to_string(),
            })
        }
        (Outcome::DuplicateId, Target::Task(id) | Target::Topic(id))
        | (Outcome::DuplicateId, Target::TopicTask { task_id: id, .. }) => {
            Err(Error::DuplicateId(id.to_string()))
        }
        (Outcome::DuplicateTitle, Target::TopicTask { topic_id, title, .. }) => {
            Err(Error::DuplicateTitle {
                topic_id: topic_id.to_string(),
                title: title.to_string(),
            })
        }
        (Outcome::DuplicateTitle, _) => Err(Error::OperationFailed(
            "unexpected duplicate-title outcome".to_string(),
        )),
    }
}

/// First eight characters of an id, for human output.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            today: self.today,
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    date,
                    time,
                    task_type,
                    description,
                    recurring_days,
                    notify,
                } => task::run_add(task::AddOptions {
                    title,
                    date,
                    time,
                    task_type,
                    description,
                    recurring_days,
                    notify,
                    global,
                }),
                TaskCommands::List { date, status } => task::run_list(task::ListOptions {
                    date,
                    status,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Update {
                    id,
                    title,
                    date,
                    time,
                    task_type,
                    description,
                    status,
                    recurring_days,
                    no_recurring,
                    notify,
                    no_notify,
                } => task::run_update(task::UpdateOptions {
                    id,
                    title,
                    date,
                    time,
                    task_type,
                    description,
                    status,
                    recurring_days,
                    no_recurring,
                    notify,
                    no_notify,
                    global,
                }),
                TaskCommands::Done { id } => task::run_set_status(task::SetStatusOptions {
                    id,
                    status: crate::model::TaskStatus::Completed,
                    command: "task done",
                    global,
                }),
                TaskCommands::Fail { id } => task::run_set_status(task::SetStatusOptions {
                    id,
                    status: crate::model::TaskStatus::Failed,
                    command: "task fail",
                    global,
                }),
                TaskCommands::Rm { id } => task::run_rm(task::RmOptions { id, global }),
            },
            Commands::Topic(cmd) => match cmd {
                TopicCommands::Add { title } => topic::run_add(topic::AddOptions { title, global }),
                TopicCommands::Rm { id } => topic::run_rm(topic::RmOptions { id, global }),
                TopicCommands::List => topic::run_list(global),
                TopicCommands::Task(cmd) => match cmd {
                    TopicTaskCommands::Add {
                        topic,
                        title,
                        description,
                    } => topic::run_task_add(topic::TaskAddOptions {
                        topic,
                        title,
                        description,
                        global,
                    }),
                    TopicTaskCommands::Update {
                        topic,
                        task,
                        title,
                        description,
                        status,
                    } => topic::run_task_update(topic::TaskUpdateOptions {
                        topic,
                        task,
                        title,
                        description,
                        status,
                        command: "topic task update",
                        global,
                    }),
                    TopicTaskCommands::Done { topic, task } => {
                        topic::run_task_update(topic::TaskUpdateOptions {
                            topic,
                            task,
                            title: None,
                            description: None,
                            status: Some("completed".to_string()),
                            command: "topic task done",
                            global,
                        })
                    }
                    TopicTaskCommands::Fail { topic, task } => {
                        topic::run_task_update(topic::TaskUpdateOptions {
                            topic,
                            task,
                            title: None,
                            description: None,
                            status: Some("failed".to_string()),
                            command: "topic task fail",
                            global,
                        })
                    }
                    TopicTaskCommands::Rm { topic, task } => {
                        topic::run_task_rm(topic::TaskRmOptions {
                            topic,
                            task,
                            global,
                        })
                    }
                    TopicTaskCommands::Promote {
                        topic,
                        task,
                        date,
                        time,
                    } => topic::run_promote(topic::PromoteOptions {
                        topic,
                        task,
                        date,
                        time,
                        global,
                    }),
                },
            },
            Commands::View(cmd) => match cmd {
                ViewCommands::Daily { date } => view::run_daily(view::DayOptions { date, global }),
                ViewCommands::Slots { date } => view::run_slots(view::DayOptions { date, global }),
                ViewCommands::Weekly { date } => {
                    view::run_weekly(view::DayOptions { date, global })
                }
                ViewCommands::Monthly { month, year } => {
                    view::run_monthly(view::MonthOptions { month, year, global })
                }
                ViewCommands::Stats { month, year } => {
                    view::run_stats(view::MonthOptions { month, year, global })
                }
            },
            Commands::Slots => view::run_time_slots(global),
            Commands::Auth(cmd) => match cmd {
                AuthCommands::Register {
                    name,
                    email,
                    password,
                    confirm_password,
                } => auth::run_register(auth::RegisterOptions {
                    name,
                    email,
                    confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                    password,
                    global,
                }),
                AuthCommands::Verify { token } => {
                    auth::run_verify(auth::VerifyOptions { token, global })
                }
                AuthCommands::Login { email, password } => auth::run_login(auth::LoginOptions {
                    email,
                    password,
                    global,
                }),
                AuthCommands::Logout => auth::run_logout(global),
                AuthCommands::Whoami => auth::run_whoami(global),
            },
            Commands::Guard { path } => auth::run_guard(auth::GuardOptions { path, global }),
        }
    }
}
