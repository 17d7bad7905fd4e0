use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info};

use healthgate::access::{export_csv, GateDecision, LogFilter, Route, RouteGate, TimeRange};
use healthgate::api::NewAccount;
use healthgate::client::RequestOptions;
use healthgate::config::{load_config, print_schema};
use healthgate::error::ApiError;
use healthgate::models::consent::parse_expiry;
use healthgate::models::{AccessLog, ConsentType, NewConsent, PatientRecord, Role, UserSummary};
use healthgate::startup::build_state;
use healthgate::state::AppState;
use healthgate::utils::logger::init_logging;
use healthgate::utils::value::value_to_string;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "healthgate")]
#[command(about = "Command-line client for the health records access portal")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short, global = true, default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        email: String,
        #[arg(long, env = "HEALTHGATE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep the session across restarts
        #[arg(long)]
        remember: bool,
    },
    /// Create a patient or healthcare worker account
    Register(RegisterArgs),
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List healthcare facilities
    Facilities,
    #[command(subcommand)]
    Consents(ConsentCommand),
    #[command(subcommand)]
    Logs(LogCommand),
    /// Send an arbitrary authenticated request and print the response
    Request {
        method: String,
        endpoint: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
    /// Check whether the stored session may open a portal path
    Gate { path: String },
    /// Print the configuration JSON schema
    Schema,
}

#[derive(Args)]
struct RegisterArgs {
    email: String,
    #[arg(long, env = "HEALTHGATE_PASSWORD", hide_env_values = true)]
    password: String,
    /// patient or healthcare_worker
    #[arg(long)]
    role: Role,
    #[arg(long)]
    national_id: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long)]
    license_number: Option<String>,
    #[arg(long)]
    job_title: Option<String>,
    #[arg(long)]
    facility: Option<String>,
}

/// Consents: patients manage theirs, healthcare workers look patients up
#[derive(Subcommand)]
enum ConsentCommand {
    /// The logged-in patient's consents
    List,
    /// Consents granted to the logged-in worker's facility
    Facility,
    /// Grant a facility access to your records
    Grant {
        facility: String,
        #[arg(long = "type", default_value = "view")]
        consent_type: ConsentType,
        /// Expiry, e.g. "2026-01-15 13:00:00"
        #[arg(long)]
        expires: String,
        #[arg(long)]
        purpose: String,
    },
    Revoke { consent_id: i64 },
    /// Look up a patient by national ID
    Check { national_id: String },
}

/// Access logs
#[derive(Subcommand)]
enum LogCommand {
    /// Who accessed the logged-in patient's records
    Mine(LogView),
    /// System-wide access logs (admins only)
    Admin(LogView),
}

#[derive(Args)]
struct LogView {
    /// 24h, 7days, 30days or all
    #[arg(long, default_value = "7days")]
    range: TimeRange,
    #[arg(long)]
    query: Option<String>,
    /// Print CSV instead of a table
    #[arg(long)]
    csv: bool,
    /// List every matching entry instead of the first few
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    info!("Loaded configuration from {}", cli.config.display());

    let state = match build_state(config) {
        Ok(state) => state,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&state, cli.command).await;
    if state.session_expired() {
        eprintln!("session expired; please log in again");
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: Commands) -> CliResult {
    match command {
        Commands::Login {
            email,
            password,
            remember,
        } => {
            let user = state.auth.login(&email, &password, remember).await?;
            println!("Logged in as {} ({})", user.display_name(), user.role);
        }
        Commands::Register(args) => register(state, args).await?,
        Commands::Logout => {
            state.auth.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => match state.auth.current_user().await? {
            Some(user) => print_user(&user),
            None => println!("Not logged in"),
        },
        Commands::Facilities => {
            for facility in state.facilities.list().await? {
                let id = facility.id.map(|id| id.to_string()).unwrap_or_default();
                println!("{:>4}  {}", id, facility.name);
            }
        }
        Commands::Consents(command) => consents(state, command).await?,
        Commands::Logs(command) => logs(state, command).await?,
        Commands::Request {
            method,
            endpoint,
            body,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut options = RequestOptions::new().method(method);
            if let Some(body) = body {
                options = options.body(body);
            }
            let response = state.client.request(&endpoint, options).await?;
            println!("{}", response.status());
            println!("{}", response.text().await?);
        }
        Commands::Gate { path } => {
            let route = Route::parse(&path);
            match RouteGate::check(&route, &state.credentials).await? {
                GateDecision::Allow(Some(user)) => println!("allow ({})", user.role),
                GateDecision::Allow(None) => println!("allow"),
                GateDecision::RedirectToLogin { from } => {
                    println!("redirect to {} (from {})", state.config.api.login_entry_point, from)
                }
                GateDecision::NotFound => println!("not found"),
            }
        }
        Commands::Schema => print_schema()?,
    }
    Ok(())
}

async fn register(state: &AppState, args: RegisterArgs) -> CliResult {
    let mut account = NewAccount::new(args.email, args.password, args.role);
    account.national_id = args.national_id;
    account.first_name = args.first_name;
    account.last_name = args.last_name;
    account.date_of_birth = args.date_of_birth;
    account.license_number = args.license_number;
    account.job_title = args.job_title;
    account.facility_name = args.facility;

    match state.auth.register(&account).await? {
        Some(user) => println!("Registered and logged in as {}", user.email),
        None => println!("Registered {}; log in to continue", account.email),
    }
    Ok(())
}

async fn logged_in(state: &AppState) -> Result<UserSummary, ApiError> {
    state
        .auth
        .current_user()
        .await?
        .ok_or(ApiError::NotAuthenticated)
}

async fn consents(state: &AppState, command: ConsentCommand) -> CliResult {
    match command {
        ConsentCommand::List => {
            let patient_id = logged_in(state)
                .await?
                .patient_id()
                .ok_or(ApiError::MissingProfile("patient"))?;
            for consent in state.consents.for_patient(patient_id).await? {
                println!(
                    "{:>4}  {:<6}  {:<8}  {}  expires {}",
                    consent.consent_id,
                    consent.consent_type.as_str(),
                    if consent.is_active() { "active" } else { "inactive" },
                    consent.facility_name(),
                    consent.expires_at.as_deref().unwrap_or("never"),
                );
            }
        }
        ConsentCommand::Facility => {
            for consent in state.consents.for_facility().await? {
                println!(
                    "{:>4}  {}  {}",
                    consent.consent_id,
                    consent.patient_name.as_deref().unwrap_or("Unknown patient"),
                    consent.purpose.as_deref().unwrap_or_default(),
                );
            }
        }
        ConsentCommand::Grant {
            facility,
            consent_type,
            expires,
            purpose,
        } => {
            let patient_id = logged_in(state)
                .await?
                .patient_id()
                .ok_or(ApiError::MissingProfile("patient"))?;
            let expires_at = parse_expiry(&expires)
                .ok_or_else(|| format!("could not read expiry '{}'", expires))?;
            let consent = NewConsent {
                facility_name: facility,
                consent_type,
                expires_at,
                purpose,
                patient_id,
            };
            state.consents.grant(&consent).await?;
            println!("Access granted to {}", consent.facility_name);
        }
        ConsentCommand::Revoke { consent_id } => {
            state.consents.revoke(consent_id).await?;
            println!("Consent {} revoked", consent_id);
        }
        ConsentCommand::Check { national_id } => {
            let record = state.consents.check(&national_id).await?;
            print_patient(&record);
        }
    }
    Ok(())
}

async fn logs(state: &AppState, command: LogCommand) -> CliResult {
    let (entries, view) = match command {
        LogCommand::Mine(view) => {
            let user = logged_in(state).await?;
            (state.access_logs.for_user(user.id).await?, view)
        }
        LogCommand::Admin(view) => (state.access_logs.admin().await?, view),
    };

    let filter = LogFilter::new(view.range, view.query);
    let matching = filter.apply(&entries, Utc::now());
    if view.csv {
        println!("{}", export_csv(&matching));
        return Ok(());
    }

    let shown = LogFilter::visible(&matching, view.all);
    for entry in shown {
        print_log(entry);
    }
    println!(
        "Showing {} of {} matching entries ({} total, range {})",
        shown.len(),
        matching.len(),
        entries.len(),
        filter.range
    );
    Ok(())
}

fn print_user(user: &UserSummary) {
    println!("{} <{}>", user.display_name(), user.email);
    println!("role: {}", user.role);
    if let Some(national_id) = user.national_id.as_deref() {
        println!("national id: {}", national_id);
    }
    if let Some(worker) = user.healthcare_worker.as_ref() {
        let facility = worker
            .healthcare_facility
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("no facility");
        println!(
            "{} at {}",
            worker.job_title.as_deref().unwrap_or("staff"),
            facility
        );
    }
}

fn print_patient(record: &PatientRecord) {
    let field = |value: &Option<Value>| value.clone().map(value_to_string).unwrap_or_default();
    println!(
        "{} {}",
        record.first_name.as_deref().unwrap_or_default(),
        record.last_name.as_deref().unwrap_or_default()
    );
    println!("national id: {}", record.national_id.as_deref().unwrap_or_default());
    println!("date of birth: {}", record.date_of_birth.as_deref().unwrap_or_default());
    println!("address: {}", field(&record.address));
    println!("emergency contact: {}", field(&record.emergency_contact));
    for (key, value) in &record.extra {
        println!("{}: {}", key.replace('_', " "), value_to_string(value.clone()));
    }
}

fn print_log(entry: &AccessLog) {
    println!(
        "{:>5}  {}  {:<7}  {:<5}  {:<24}  {:<24}  {}",
        entry.log_id,
        entry.timestamp,
        entry.result.as_str(),
        entry.action.as_str(),
        entry.patient_name(),
        entry.accessor_label(),
        entry.reason.as_deref().unwrap_or_default()
    );
}
