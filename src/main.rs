use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use club_profiles::{
    normalize_handle, HandleValidator, InMemoryProfileStore, LeetCodeVerifier, LoggingMailer,
    LoggingSink, PasswordResetError, PasswordResetService, PortalConfig, ProfileError,
    ProfileNotifier, ProfileService, ProfileStore, ProfileUpdate, RequestContext, Role,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "profile-check",
    version,
    about = "Validate and update club profiles against a profile snapshot"
)]
struct Args {
    /// Profile snapshot file (defaults to PROFILE_STORE_PATH)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of a handle
    Normalize {
        #[arg(short, long)]
        platform: String,
        value: String,
    },
    /// Check a submission for duplicate claims without saving it
    Check {
        #[arg(short, long)]
        user: String,
        /// JSON file holding the profile update
        #[arg(long)]
        submission: PathBuf,
    },
    /// Validate and save a submission as the given user
    Upsert {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        submission: PathBuf,
        /// Act with admin privileges (may change a locked leetcode handle)
        #[arg(long)]
        admin: bool,
    },
    /// Check that a LeetCode user recently solved a problem
    VerifyLeetcode {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        problem: String,
        #[arg(long, default_value = "24")]
        hours: u64,
    },
    /// Issue a password reset link for an account
    RequestReset {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password using a reset token
    ResetPassword {
        #[arg(short, long)]
        token: String,
        #[arg(short, long)]
        password: String,
    },
}

fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,club_profiles=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_submission(path: &Path) -> Result<ProfileUpdate> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read submission {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid submission {}", path.display()))
}

async fn check(store: Arc<InMemoryProfileStore>, user: &str, submission: &Path) -> Result<bool> {
    let update = read_submission(submission).await?;
    let validator = HandleValidator::new(store);

    let mut errors = match &update.handles {
        Some(handles) => validator.validate_handles(handles, Some(user)).await?,
        None => Vec::new(),
    };
    errors.extend(
        validator
            .validate_profile_fields(
                update.contact.as_deref(),
                update.linked_in.as_deref(),
                Some(user),
            )
            .await?,
    );

    for message in &errors {
        println!("{message}");
    }
    if errors.is_empty() {
        println!("ok");
    }
    Ok(errors.is_empty())
}

async fn upsert(
    config: &PortalConfig,
    store: Arc<InMemoryProfileStore>,
    store_path: &Path,
    user: &str,
    submission: &Path,
    admin: bool,
) -> Result<bool> {
    let update = read_submission(submission).await?;

    let registered_admin = matches!(
        store.get_user(user).await?,
        Some(account) if account.role == Role::Admin
    );
    if admin && !registered_admin {
        error!("--admin requires a registered admin account for {}", user);
        return Ok(false);
    }
    let ctx = if admin {
        RequestContext::admin(user)
    } else {
        RequestContext::member(user)
    };

    let cancellation_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();
    let notifier = ProfileNotifier::new(config.notify_queue_size);
    notifier.spawn_worker(Arc::new(LoggingSink), cancellation_token.clone(), &task_tracker);

    let service = ProfileService::new(store.clone(), notifier);
    let outcome = service.upsert_profile(&ctx, update).await;

    // Let queued notifications drain before exiting
    drop(service);
    task_tracker.close();
    cancellation_token.cancel();
    task_tracker.wait().await;

    match outcome {
        Ok(profile) => {
            store.save_snapshot(store_path).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(true)
        }
        Err(ProfileError::Validation(message)) => {
            println!("{message}");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Lookback window for `verify-leetcode`; absurd hour counts saturate
fn lookback_window(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

async fn verify_leetcode(
    config: &PortalConfig,
    username: &str,
    problem: &str,
    hours: u64,
) -> Result<bool> {
    let verifier = LeetCodeVerifier::new(config.leetcode.clone())?;
    let verification = verifier
        .verify_submission(username, problem, lookback_window(hours))
        .await?;

    match &verification.submission {
        Some(submission) => println!(
            "verified: {} solved \"{}\" at {}",
            username, submission.title, submission.timestamp
        ),
        None => println!(
            "not verified: no accepted \"{}\" submission in the last {} hours",
            problem, hours
        ),
    }
    Ok(verification.verified)
}

fn reset_service(config: &PortalConfig, store: Arc<InMemoryProfileStore>) -> PasswordResetService {
    PasswordResetService::new(
        store,
        Arc::new(LoggingMailer),
        config.password_reset.clone(),
    )
}

async fn request_reset(
    config: &PortalConfig,
    store: Arc<InMemoryProfileStore>,
    store_path: &Path,
    email: &str,
) -> Result<bool> {
    match reset_service(config, store.clone()).request_reset(email).await {
        Ok(()) => {
            store.save_snapshot(store_path).await?;
            println!("If an account exists with that email, a password reset link has been sent.");
            Ok(true)
        }
        Err(PasswordResetError::EmailRequired) => {
            println!("{}", PasswordResetError::EmailRequired);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn reset_password(
    config: &PortalConfig,
    store: Arc<InMemoryProfileStore>,
    store_path: &Path,
    token: &str,
    password: &str,
) -> Result<bool> {
    match reset_service(config, store.clone())
        .reset_password(token, password)
        .await
    {
        Ok(()) => {
            store.save_snapshot(store_path).await?;
            println!("Password has been reset successfully.");
            Ok(true)
        }
        Err(e @ (PasswordResetError::Store(_) | PasswordResetError::Hash(_))) => Err(e.into()),
        Err(e) => {
            println!("{e}");
            Ok(false)
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let config = PortalConfig::from_env();
    let store_path = args.store.clone().unwrap_or_else(|| config.store_path.clone());

    match args.command {
        Command::Normalize { platform, value } => {
            println!("{}", normalize_handle(&platform, &value));
            Ok(true)
        }
        Command::Check { user, submission } => {
            let store = Arc::new(InMemoryProfileStore::load_snapshot(&store_path).await?);
            info!(
                "Checking submission for user {} against {} profiles",
                user,
                store.profile_count()
            );
            check(store, &user, &submission).await
        }
        Command::Upsert {
            user,
            submission,
            admin,
        } => {
            let store = Arc::new(InMemoryProfileStore::load_snapshot(&store_path).await?);
            upsert(&config, store, &store_path, &user, &submission, admin).await
        }
        Command::VerifyLeetcode {
            username,
            problem,
            hours,
        } => verify_leetcode(&config, &username, &problem, hours).await,
        Command::RequestReset { email } => {
            let store = Arc::new(InMemoryProfileStore::load_snapshot(&store_path).await?);
            request_reset(&config, store, &store_path, &email).await
        }
        Command::ResetPassword { token, password } => {
            let store = Arc::new(InMemoryProfileStore::load_snapshot(&store_path).await?);
            reset_password(&config, store, &store_path, &token, &password).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    setup_tracing();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
