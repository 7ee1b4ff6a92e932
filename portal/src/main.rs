// EL BARAA - school portal
// Entry point and command-line parsing

use clap::{Args, Parser, Subcommand, ValueEnum};
use elbaraa::access::Role;
use elbaraa::app;
use elbaraa::catalog::{FileType, Grade};
use elbaraa::commands::{self, AdminLogin, OutputFormat, UploadRequest};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "EL BARAA school portal", long_about = None)]
struct Cli {
    /// Directory holding settings and the local gateway
    #[arg(long, env = "ELBARAA_DATA_DIR", default_value = ".elbaraa", global = true)]
    data_dir: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct AdminArgs {
    #[arg(long, env = "ELBARAA_ADMIN_USERNAME", default_value = "admin")]
    username: String,

    #[arg(long, env = "ELBARAA_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

impl From<AdminArgs> for AdminLogin {
    fn from(args: AdminArgs) -> Self {
        AdminLogin {
            username: args.username,
            password: args.password,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StaffAccount {
    Admin,
    Teacher,
}

impl From<StaffAccount> for Role {
    fn from(account: StaffAccount) -> Self {
        match account {
            StaffAccount::Admin => Role::Admin,
            StaffAccount::Teacher => Role::Teacher,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the grades
    Grades,
    /// List the subjects of a grade
    Subjects { grade: Grade },
    /// Show the materials of a subject
    Materials { grade: Grade, subject: String },
    /// Show school announcements
    Announcements,
    /// Show a grade's calendar
    Calendar {
        #[arg(long, default_value = "10th")]
        grade: Grade,
    },
    /// Resolve a portal path
    Route { path: String },
    /// Upload a study material (teacher portal)
    Upload {
        #[arg(long)]
        grade: Grade,
        #[arg(long)]
        subject: String,
        #[arg(long = "type", default_value = "pdf")]
        file_type: FileType,
        #[arg(long)]
        file: PathBuf,
        /// Override the MIME type guessed from the extension
        #[arg(long)]
        mime: Option<String>,
        #[arg(long, env = "ELBARAA_TEACHER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Publish an announcement (admin dashboard)
    Announce {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Add a calendar event (admin dashboard)
    AddEvent {
        #[arg(long)]
        grade: Grade,
        #[arg(long)]
        title: String,
        /// Event date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Hash a staff password for settings.json
    HashPassword { password: String },
    /// Store a staff password in settings.json
    SetPassword {
        #[arg(value_enum)]
        account: StaffAccount,
        /// New admin login name
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "ELBARAA_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elbaraa=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let output = match cli.command {
        Command::Grades => commands::list_grades(format)?,
        Command::Route { path } => commands::resolve_route(&path, format)?,
        Command::HashPassword { password } => commands::hash_password_command(&password)?,
        command => {
            tracing::info!("Starting EL BARAA portal");
            let state = app::setup(cli.data_dir).await?;
            run(&state, command, format).await?
        }
    };

    println!("{}", output);
    Ok(())
}

async fn run(state: &app::AppState, command: Command, format: OutputFormat) -> anyhow::Result<String> {
    let output = match command {
        Command::Subjects { grade } => commands::list_subjects(state, grade, format)?,
        Command::Materials { grade, subject } => {
            commands::list_materials(state, grade, &subject, format).await?
        }
        Command::Announcements => commands::list_announcements(state, format).await?,
        Command::Calendar { grade } => commands::show_calendar(state, grade, format).await?,
        Command::Upload {
            grade,
            subject,
            file_type,
            file,
            mime,
            password,
        } => {
            let request = UploadRequest {
                grade,
                subject: &subject,
                file_type,
                file: &file,
                mime_type: mime.as_deref(),
                password: &password,
            };
            commands::upload_material(state, request, format).await?
        }
        Command::Announce {
            title,
            message,
            admin,
        } => commands::publish_announcement(state, &admin.into(), &title, &message, format).await?,
        Command::AddEvent {
            grade,
            title,
            date,
            image,
            admin,
        } => {
            commands::add_calendar_event(
                state,
                &admin.into(),
                grade,
                &title,
                &date,
                image.as_deref(),
                format,
            )
            .await?
        }
        Command::SetPassword {
            account,
            username,
            password,
        } => {
            commands::set_staff_password(state, account.into(), username.as_deref(), &password)
                .await?
        }
        Command::Grades | Command::Route { .. } | Command::HashPassword { .. } => {
            anyhow::bail!("command does not need application state")
        }
    };

    Ok(output)
}
