//! Fooddash CLI: command-line client for the fooddash dashboard API.
//!
//! Configuration comes from FOODDASH_* environment variables (see `ClientConfig`). The
//! session is kept in FOODDASH_SESSION_FILE between runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fooddash_api_client::ApiClient;
use fooddash_cli::{
    describe_task, format_file_size, init_tracing, print_json, truncate_string, CliRouter,
};
use fooddash_core::models::{RestaurantQuery, TaskId, UploadFile};
use fooddash_core::{
    auth_event_channel, AppError, ClientConfig, PreviewProvider, TracingNotifier, TransportError,
};
use fooddash_session::SessionManager;
use fooddash_storage::FileStore;
use fooddash_upload::{NoPreviews, ThumbnailPreviews, UploadPipeline};

#[derive(Parser)]
#[command(name = "fooddash", about = "Fooddash dashboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a customer account and log in
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Upload one or more files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Destination folder (defaults to FOODDASH_UPLOAD_FOLDER)
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete an uploaded file
    DeleteFile { folder: String, filename: String },
    /// List restaurants
    Restaurants {
        /// Filter by cuisine type
        #[arg(long)]
        cuisine: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Get a restaurant by ID
    Restaurant { id: i64 },
    /// List a restaurant's menu
    Menu { restaurant_id: i64 },
    /// List your orders
    Orders,
    /// Get an order by ID
    Order { id: i64 },
    /// List users
    Users,
    /// System analytics, or one restaurant's with --restaurant
    Analytics {
        #[arg(long)]
        restaurant: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let cli = Cli::parse();

    let store = FileStore::open(config.session_file.clone())
        .await
        .with_context(|| format!("Failed to open {}", config.session_file.display()))?;

    let (events_tx, events_rx) = auth_event_channel();
    let transport = ApiClient::from_config(&config)
        .context("Failed to create API client")?
        .with_auth_events(events_tx);

    let session = SessionManager::start(
        Arc::new(transport.clone()),
        Arc::new(store),
        Arc::new(CliRouter),
        Arc::new(TracingNotifier),
        events_rx,
    )
    .await;
    let client = transport.with_credentials(session.credentials());

    let result = run(cli.command, &config, &session, &client).await;
    session.shutdown();
    result
}

async fn run(
    command: Commands,
    config: &ClientConfig,
    session: &SessionManager,
    client: &ApiClient,
) -> anyhow::Result<()> {
    match command {
        Commands::Login { email, password } => {
            session.login(&email, &password).await?;
            print_whoami(session)?;
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            phone,
        } => {
            session
                .register(&first_name, &last_name, &email, &password, &phone)
                .await?;
            print_whoami(session)?;
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => {
            session.require_authenticated()?;
            print_whoami(session)?;
        }
        Commands::Upload { files, folder } => {
            session.require_authenticated()?;
            let folder = folder.unwrap_or_else(|| config.upload_folder.clone());
            upload(config, session, client, files, folder).await?;
        }
        Commands::DeleteFile { folder, filename } => {
            session.require_authenticated()?;
            checked(session, client.delete_file(&folder, &filename).await).await?;
            println!("Deleted {}/{}", folder, filename);
        }
        Commands::Restaurants {
            cuisine,
            page,
            size,
        } => {
            session.require_authenticated()?;
            let query = RestaurantQuery {
                cuisine_type: cuisine,
                page,
                size,
            };
            let restaurants = checked(session, client.list_restaurants(&query).await).await?;
            print_json(&restaurants)?;
        }
        Commands::Restaurant { id } => {
            session.require_authenticated()?;
            print_json(&checked(session, client.get_restaurant(id).await).await?)?;
        }
        Commands::Menu { restaurant_id } => {
            session.require_authenticated()?;
            print_json(&checked(session, client.get_menu(restaurant_id).await).await?)?;
        }
        Commands::Orders => {
            session.require_authenticated()?;
            print_json(&checked(session, client.my_orders().await).await?)?;
        }
        Commands::Order { id } => {
            session.require_authenticated()?;
            print_json(&checked(session, client.get_order(id).await).await?)?;
        }
        Commands::Users => {
            session.require_authenticated()?;
            print_json(&checked(session, client.list_users().await).await?)?;
        }
        Commands::Analytics { restaurant } => {
            session.require_authenticated()?;
            let analytics = match restaurant {
                Some(id) => checked(session, client.restaurant_analytics(id).await).await?,
                None => checked(session, client.system_analytics().await).await?,
            };
            print_json(&analytics)?;
        }
    }

    Ok(())
}

fn print_whoami(session: &SessionManager) -> anyhow::Result<()> {
    let user = session.user().context("No session")?;
    println!("{} <{}> ({})", user.display_name(), user.email, user.role);
    Ok(())
}

/// Convert a transport failure. A rejected credential is handled by the session's
/// listener; wait for it so the stored session is gone before the process exits.
async fn checked<T>(
    session: &SessionManager,
    result: Result<T, TransportError>,
) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            let err = AppError::from_request_failure(&err);
            if matches!(err, AppError::SessionExpired) {
                let mut state = session.subscribe();
                let cleared = tokio::time::timeout(
                    Duration::from_secs(2),
                    state.wait_for(|s| !s.is_authenticated()),
                )
                .await;
                if cleared.is_err() {
                    tracing::warn!("Session was not cleared after credential rejection");
                }
            }
            Err(err.into())
        }
    }
}

async fn upload(
    config: &ClientConfig,
    session: &SessionManager,
    client: &ApiClient,
    paths: Vec<PathBuf>,
    folder: String,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }

    let previews: Arc<dyn PreviewProvider> = match ThumbnailPreviews::new(config.preview_dir.clone()) {
        Ok(previews) => Arc::new(previews),
        Err(e) => {
            tracing::warn!(error = %e, "Previews disabled");
            Arc::new(NoPreviews)
        }
    };

    let pipeline = UploadPipeline::new(
        Arc::new(client.clone()),
        previews,
        Arc::new(TracingNotifier),
        config.upload_policy.clone(),
        folder,
    );

    let report = pipeline.submit_all(files);
    for rejection in &report.rejected {
        eprintln!("Skipped {}", rejection);
    }
    if report.accepted.is_empty() {
        anyhow::bail!("No files to upload");
    }

    tokio::select! {
        _ = follow_progress(&pipeline) => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted, cancelling uploads");
            for id in &report.accepted {
                pipeline.cancel(*id);
            }
        }
    }
    // Previews still rendering must be attached before shutdown can release them.
    pipeline.wait_settled().await;

    let tasks = pipeline.tasks();
    println!();
    println!("{:<32} {:>10}  STATUS", "FILE", "SIZE");
    for task in &tasks {
        println!(
            "{:<32} {:>10}  {}",
            truncate_string(&task.name, 32),
            format_file_size(task.size),
            describe_task(task)
        );
    }

    let failed = tasks
        .iter()
        .filter(|task| task.file_url.is_none())
        .count();
    pipeline.shutdown();

    if failed > 0 {
        // A rejected credential fails the upload and clears the session shortly after.
        let mut state = session.subscribe();
        let expired = tokio::time::timeout(
            Duration::from_millis(200),
            state.wait_for(|s| !s.is_authenticated()),
        )
        .await;
        if matches!(expired, Ok(Ok(_))) {
            return Err(AppError::SessionExpired.into());
        }
        anyhow::bail!("{} of {} uploads did not complete", failed, tasks.len());
    }
    Ok(())
}

/// Print a line whenever a task's progress or status changes, until all have settled.
async fn follow_progress(pipeline: &UploadPipeline) {
    let mut updates = pipeline.subscribe();
    let mut last: HashMap<TaskId, String> = HashMap::new();

    loop {
        let tasks = updates.borrow_and_update().clone();
        for task in &tasks {
            let line = describe_task(task);
            if last.get(&task.id) != Some(&line) {
                eprintln!("{}: {}", task.name, line);
                last.insert(task.id, line);
            }
        }

        if tasks.iter().all(|task| task.status.is_terminal()) {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
}
