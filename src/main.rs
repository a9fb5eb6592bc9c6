//! Attendance Dashboard - command-line client for attendance, punctuality and administration.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use attendance_dashboard as app;

use app::client::ApiClient;
use app::config::{AppConfig, ConfigLoadResult, SessionStore};
use app::export;
use app::models::attendance::{AdminDashboardQuery, AttendanceHistoryQuery, AttendanceLogsQuery, CurrentStatusQuery};
use app::models::auth::{ChangePasswordRequest, ChangeRoleRequest, SigninRequest, SignupRequest};
use app::models::user::{ListUsersQuery, UserStatus};
use app::models::{
    AssignDepartment, AttendanceRecord, CreateDepartment, Department, Direction, PageQuery, Role, Session,
    UpdateDepartment, UpdateProfile,
};
use app::session::{CurrentStatus, EvaluatedRecord, SessionStatistics, SessionTracker, summarize};
use app::AppError;

/// Employee attendance dashboard client.
#[derive(Parser)]
#[command(name = "attendance-dashboard", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and store the session
    Signin {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Signout,
    /// Exchange the stored refresh token for a new access token
    Refresh,
    /// Change the signed-in user's password
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Change the signed-in user's role
    ChangeRole { role: Role },
    /// Show whether a user is clocked in
    Status {
        /// Defaults to the signed-in user
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Start a work session
    ClockIn,
    /// End the open work session
    ClockOut,
    /// Recent attendance with punctuality and statistics
    History(HistoryArgs),
    /// Attendance log of all employees (admin)
    Logs(LogsArgs),
    /// Department management
    #[command(subcommand)]
    Departments(DepartmentCommand),
    /// List users (admin)
    Users {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        department_id: Option<String>,
        /// Created on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Created on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show the profile, or update it when any field is given
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Organisation-wide numbers (admin)
    Admin {
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Export history with punctuality, or the admin log, to Excel
    Export {
        /// Export the admin attendance log instead of personal history
        #[arg(long)]
        logs: bool,
        #[command(flatten)]
        history: HistoryArgs,
        /// Log date for --logs (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output file; generated from the current time when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

impl PageArgs {
    fn query(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

#[derive(clap::Args)]
struct HistoryArgs {
    /// Whose history; defaults to the signed-in user
    #[arg(long)]
    user_id: Option<String>,
    /// Policy to evaluate against; defaults to the signed-in user's department
    #[arg(long)]
    department_id: Option<String>,
    /// Records to fetch; defaults to display.history_limit
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(clap::Args)]
struct LogsArgs {
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    department_id: Option<String>,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Subcommand)]
enum DepartmentCommand {
    /// List departments
    List(PageArgs),
    /// Show one department
    Show { id: String },
    /// Create a department (admin)
    Create {
        name: String,
        /// Latest on-time clock-in (HH:MM[:SS] or ISO-8601)
        #[arg(long = "in")]
        clock_in: String,
        /// Earliest on-time clock-out (HH:MM[:SS] or ISO-8601)
        #[arg(long = "out")]
        clock_out: String,
    },
    /// Update a department (admin)
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "in")]
        clock_in: Option<String>,
        #[arg(long = "out")]
        clock_out: Option<String>,
    },
    /// Delete a department (admin)
    Delete { id: String },
    /// Assign a user to a department (admin)
    Assign { department_id: String, user_id: String },
}

/// Loaded configuration plus the pieces every command needs.
struct App {
    config: AppConfig,
    client: ApiClient,
    store: SessionStore,
    tracker: SessionTracker,
}

impl App {
    fn session(&self) -> app::Result<Session> {
        self.store
            .load()
            .map_err(|e| AppError::config(e.to_string()))?
            .ok_or_else(|| AppError::Unauthorized("run `attendance-dashboard signin` first".to_string()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(io::stderr)
        .init();

    // Determine config path based on mode
    let config_path = if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };
    tracing::debug!("Config path: {:?}", config_path);

    let config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => config,
        ConfigLoadResult::Missing => {
            tracing::info!("Config missing, writing defaults");
            let config = AppConfig::default();
            if let Err(e) = config.save(&config_path) {
                eprintln!("Could not write {}: {e}", config_path.display());
                return ExitCode::FAILURE;
            }
            eprintln!(
                "Created {} with default settings; edit api.base_url if needed.",
                config_path.display()
            );
            config
        }
        ConfigLoadResult::Invalid(e) => {
            tracing::warn!("Config invalid: {}", e);
            eprintln!("Invalid config {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig, config_path: &Path) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api).context("Failed to create HTTP client")?;
    tracing::debug!("Evaluating punctuality in zone {}", config.zone());
    let ctx = App {
        tracker: SessionTracker::new(config.zone()),
        store: SessionStore::beside(config_path),
        client,
        config,
    };

    match command {
        Command::Signup {
            email,
            full_name,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let created = ctx
                .client
                .signup(&SignupRequest {
                    email,
                    password,
                    full_name,
                })
                .await?;
            println!("Account created for {} ({})", created.email, created.id);
        }
        Command::Signin { email, password } => {
            let password = password_or_prompt(password)?;
            let resp = ctx.client.signin(&SigninRequest { email, password }).await?;
            let session = Session::from(resp);
            ctx.store.save(&session)?;
            tracing::info!("Session stored at {}", ctx.store.path().display());
            println!("Signed in as {} ({})", session.full_name, session.role);
        }
        Command::Signout => {
            let session = ctx.session()?;
            // Forget the local session even when the server call fails
            let result = ctx.client.signout(&session).await;
            ctx.store.clear()?;
            result?;
            println!("Signed out");
        }
        Command::Refresh => {
            let mut session = ctx.session()?;
            let tokens = ctx.client.refresh_token(&session.refresh_token).await?;
            session.access_token = tokens.access_token;
            session.refresh_token = tokens.refresh_token;
            ctx.store.save(&session)?;
            println!("Session refreshed");
        }
        Command::Password { old, new } => {
            let session = ctx.session()?;
            ctx.client
                .change_password(
                    &session,
                    &ChangePasswordRequest {
                        old_password: old,
                        new_password: new,
                    },
                )
                .await?;
            println!("Password changed");
        }
        Command::ChangeRole { role } => {
            let mut session = ctx.session()?;
            ctx.client.change_role(&session, &ChangeRoleRequest { role }).await?;
            session.role = role;
            ctx.store.save(&session)?;
            println!("Role changed to {role}");
        }
        Command::Status { user_id } => status(&ctx, user_id).await?,
        Command::ClockIn => clock(&ctx, Direction::In).await?,
        Command::ClockOut => clock(&ctx, Direction::Out).await?,
        Command::History(args) => {
            let session = ctx.session()?;
            let Some((evaluated, stats)) = evaluated_history(&ctx, &session, &args).await? else {
                return Ok(());
            };
            print_history(&evaluated, &stats);
        }
        Command::Logs(args) => {
            let session = ctx.session()?;
            let query = AttendanceLogsQuery {
                date: args.date,
                department_id: args.department_id,
                page: args.page.query(),
            };
            let logs = ctx.client.attendance_logs(&session, &query).await?;
            if logs.is_empty() {
                println!("No attendance logs");
            }
            for log in &logs {
                println!(
                    "{:<12} {:<25} {:<20} in {:<20} {:<8} out {:<20} {}",
                    log.employee_code,
                    log.full_name,
                    log.department_name,
                    log.clock_in.as_deref().unwrap_or("-"),
                    log.in_punctuality,
                    log.clock_out.as_deref().unwrap_or("-"),
                    log.out_punctuality,
                );
            }
        }
        Command::Departments(cmd) => departments(&ctx, cmd).await?,
        Command::Users {
            email,
            status,
            department_id,
            from,
            to,
            page,
        } => {
            let session = ctx.session()?;
            let status = status.as_deref().map(parse_user_status).transpose()?;
            let query = ListUsersQuery {
                email,
                status,
                department_id,
                created_at_start: from,
                created_at_end: to,
                page: page.query(),
            };
            let list = ctx.client.list_users(&session, &query).await?;
            for user in &list.users {
                println!(
                    "{:<38} {:<12} {:<25} {:<20} {}",
                    user.id,
                    user.employee_code,
                    user.full_name,
                    user.department_name().unwrap_or("-"),
                    user.role(),
                );
            }
            println!(
                "Page {} of {} ({} users)",
                list.pagination.current_page, list.pagination.total_pages, list.pagination.total_items
            );
        }
        Command::Profile {
            full_name,
            phone,
            avatar_url,
            address,
        } => {
            let session = ctx.session()?;
            let update = UpdateProfile {
                full_name,
                phone,
                avatar_url,
                address,
            };
            let is_update = update.full_name.is_some()
                || update.phone.is_some()
                || update.avatar_url.is_some()
                || update.address.is_some();
            let profile = if is_update {
                ctx.client.update_profile(&session, &update).await?
            } else {
                ctx.client.profile(&session).await?
            };
            println!("Name:       {}", profile.full_name);
            println!("Code:       {}", profile.employee_code);
            println!("Phone:      {}", profile.phone);
            println!("Address:    {}", profile.address);
            match &profile.department {
                Some(dept) => println!(
                    "Department: {} (in by {}, out from {})",
                    dept.name,
                    dept.cutoff_label(Direction::In),
                    dept.cutoff_label(Direction::Out)
                ),
                None => println!("Department: waiting for assignment"),
            }
        }
        Command::Admin { start_date, end_date } => {
            let session = ctx.session()?;
            let dashboard = ctx
                .client
                .admin_dashboard(&session, &AdminDashboardQuery { start_date, end_date })
                .await?;
            println!("Departments updated: {}", dashboard.total_updated_depts);
            println!("New registrations today: {}", dashboard.total_today_registrations);
            println!("Employees per department:");
            for (name, count) in &dashboard.total_employees_per_dept {
                println!("  {name:<25} {count}");
            }
        }
        Command::Export {
            logs,
            history,
            date,
            output,
        } => {
            let session = ctx.session()?;
            if logs {
                let query = AttendanceLogsQuery {
                    date,
                    department_id: history.department_id,
                    page: PageQuery::default(),
                };
                let rows = ctx.client.attendance_logs(&session, &query).await?;
                let path = output.unwrap_or_else(|| PathBuf::from(export::generate_export_filename("attendance_logs")));
                export::export_logs_to_excel(&rows, &path).map_err(AppError::from)?;
                println!("Exported {} rows to {}", rows.len(), path.display());
            } else {
                let Some((evaluated, stats)) = evaluated_history(&ctx, &session, &history).await? else {
                    return Ok(());
                };
                let path =
                    output.unwrap_or_else(|| PathBuf::from(export::generate_export_filename("attendance_history")));
                export::export_history_to_excel(&evaluated, &stats, &path).map_err(AppError::from)?;
                println!("Exported {} records to {}", evaluated.len(), path.display());
            }
        }
    }

    Ok(())
}

/// Print the clock state, falling back to today's raw history when the
/// status endpoint is unavailable.
async fn status(ctx: &App, user_id: Option<String>) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let query = CurrentStatusQuery {
        user_id: user_id.clone(),
    };
    match ctx.client.current_status(&session, &query).await {
        Ok(resp) => {
            let current = CurrentStatus::from(&resp);
            println!("{} ({})", resp.full_name, resp.employee_code);
            if let Some(dept) = &resp.department {
                println!("Department: {dept}");
            }
            print_status(&current);
        }
        Err(e @ (AppError::Unauthorized(_) | AppError::Forbidden(_) | AppError::Validation(_))) => {
            return Err(e.into());
        }
        Err(e) => {
            tracing::warn!("Current status unavailable, deriving from history: {}", e);
            let user_id = user_id.unwrap_or_else(|| session.user_id.clone());
            let history = ctx
                .client
                .attendance_history(&session, &AttendanceHistoryQuery::new(user_id))
                .await?;
            let today = ctx.tracker.zone().now().date();
            let current = derive_for_day(&ctx.tracker, &history, today);
            print_status(&current);
        }
    }
    Ok(())
}

fn derive_for_day(tracker: &SessionTracker, history: &[AttendanceRecord], day: NaiveDate) -> CurrentStatus {
    let events = tracker.events_on(history, day);
    tracker.derive_current_status(events)
}

fn print_status(current: &CurrentStatus) {
    println!("Status:     {}", current.status);
    println!("Clock in:   {}", current.clock_in.as_deref().unwrap_or("-"));
    println!("Clock out:  {}", current.clock_out.as_deref().unwrap_or("-"));
    if current.status != app::models::ClockStatus::ClockedOut {
        println!("Next:       clock-{}", current.next_action());
    }
}

/// Send one clock action. A rejection prints the server message and leaves nothing changed.
async fn clock(ctx: &App, direction: Direction) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let resp = ctx.client.clock(&session, direction).await?;
    let current = CurrentStatus::not_clocked().after_clock(direction, &resp);
    match direction {
        Direction::In => println!("Clocked in at {}", current.clock_in.as_deref().unwrap_or("-")),
        Direction::Out => println!("Clocked out at {}", current.clock_out.as_deref().unwrap_or("-")),
    }
    Ok(())
}

/// Fetch history and the applicable policy, then evaluate. `None` when the
/// user has no department yet.
async fn evaluated_history(
    ctx: &App,
    session: &Session,
    args: &HistoryArgs,
) -> anyhow::Result<Option<(Vec<EvaluatedRecord>, SessionStatistics)>> {
    let policy: Department = match &args.department_id {
        Some(id) => ctx.client.get_department(session, id).await?,
        None => match ctx.client.profile(session).await?.department {
            Some(dept) => dept,
            None => {
                println!("Waiting for department assignment; punctuality cannot be evaluated yet.");
                return Ok(None);
            }
        },
    };

    let user_id = args.user_id.clone().unwrap_or_else(|| session.user_id.clone());
    let limit = args.limit.unwrap_or(ctx.config.display.history_limit);
    let query = AttendanceHistoryQuery::new(user_id).with_limit(limit);
    let history = ctx.client.attendance_history(session, &query).await?;

    let evaluated = ctx.tracker.evaluate_history(&history, &policy);
    let stats = summarize(&evaluated);
    Ok(Some((evaluated, stats)))
}

fn print_history(evaluated: &[EvaluatedRecord], stats: &SessionStatistics) {
    if evaluated.is_empty() {
        println!("No attendance records");
    }
    for e in evaluated {
        let when = e
            .local_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<4} deadline {:<5} {:<8} {}",
            when,
            e.record.attendance_type,
            e.deadline,
            e.result.status,
            e.result.message
        );
    }
    println!(
        "On time {} | Late {} | Early {} | Unknown {} | Total {} | {:.1}% on time",
        stats.on_time_count,
        stats.late_count,
        stats.early_count,
        stats.unknown_count,
        stats.total,
        stats.on_time_percentage()
    );
}

async fn departments(ctx: &App, cmd: DepartmentCommand) -> anyhow::Result<()> {
    let session = ctx.session()?;
    match cmd {
        DepartmentCommand::List(page) => {
            let list = ctx.client.list_departments(&session, page.query()).await?;
            for dept in &list {
                print_department(dept);
            }
        }
        DepartmentCommand::Show { id } => {
            let dept = ctx.client.get_department(&session, &id).await?;
            print_department(&dept);
        }
        DepartmentCommand::Create {
            name,
            clock_in,
            clock_out,
        } => {
            let data = CreateDepartment {
                name,
                max_clock_in_time: clock_in,
                max_clock_out_time: clock_out,
            };
            let dept = ctx.client.create_department(&session, &data).await?;
            print_department(&dept);
        }
        DepartmentCommand::Update {
            id,
            name,
            clock_in,
            clock_out,
        } => {
            let data = UpdateDepartment {
                name,
                max_clock_in_time: clock_in,
                max_clock_out_time: clock_out,
            };
            let dept = ctx.client.update_department(&session, &id, &data).await?;
            print_department(&dept);
        }
        DepartmentCommand::Delete { id } => {
            ctx.client.delete_department(&session, &id).await?;
            println!("Department {id} deleted");
        }
        DepartmentCommand::Assign { department_id, user_id } => {
            ctx.client
                .assign_department(&session, &AssignDepartment { department_id, user_id })
                .await?;
            println!("Assigned");
        }
    }
    Ok(())
}

fn print_department(dept: &Department) {
    println!(
        "{:<38} {:<25} in by {:<5}  out from {:<5}",
        dept.id,
        dept.name,
        dept.cutoff_label(Direction::In),
        dept.cutoff_label(Direction::Out)
    );
}

fn parse_user_status(raw: &str) -> app::Result<UserStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => Ok(UserStatus::Active),
        "inactive" => Ok(UserStatus::Inactive),
        other => Err(AppError::validation(format!("Unknown user status '{other}'"))),
    }
}

fn password_or_prompt(password: Option<String>) -> io::Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
