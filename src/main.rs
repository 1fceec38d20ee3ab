use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rolegate::memory::{MemoryIdentityProvider, MemoryProfileStore, MemoryStorage, RecordingNavigator};
use rolegate::{AuthCoordinator, Collaborators, CoordinatorConfig, GuardOutcome, Identity, Profile, Role};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "rolegate", about = "Simulate auth-state redirects for a page load")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one page load against in-memory collaborators and print navigations.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Path of the page being loaded.
    #[arg(long, env = "ROLEGATE_SIM_PATH", default_value = "/login")]
    path: String,

    /// Signed-in identity id; omit for a signed-out session.
    #[arg(long, env = "ROLEGATE_SIM_USER")]
    user_id: Option<String>,

    #[arg(long)]
    email: Option<String>,

    /// Role stored in the user's profile.
    #[arg(long, default_value = "user")]
    role: Role,

    /// Signed in, but no profile document exists.
    #[arg(long)]
    profile_missing: bool,

    /// Profile lookups fail.
    #[arg(long)]
    profile_error: bool,

    /// Also run the page guard requiring this role.
    #[arg(long)]
    require: Option<Role>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate(args).await,
    }
}

async fn simulate(args: SimulateArgs) {
    let config = CoordinatorConfig::from_env();
    let session = args.user_id.as_ref().map(|id| Identity::new(id, args.email.clone()));

    let provider = MemoryIdentityProvider::new(session);
    let store = MemoryProfileStore::new();
    let navigator = RecordingNavigator::new(&args.path);
    if let Some(id) = &args.user_id {
        if !args.profile_missing {
            store.insert(id, Profile::with_role(args.role));
        }
        store.fail_for(id, args.profile_error);
    }

    let coordinator = AuthCoordinator::new(
        config,
        Collaborators {
            provider: Arc::new(provider),
            profiles: Arc::new(store.clone()),
            storage: Arc::new(MemoryStorage::new()),
            navigator: Arc::new(navigator.clone()),
        },
    );

    coordinator.initialize();
    settle().await;

    let guard = match args.require {
        Some(role) => Some(coordinator.check_user_type(role).await),
        None => None,
    };
    settle().await;
    coordinator.cleanup();

    let report = json!({
        "path": args.path,
        "page": format!("{:?}", coordinator.config().routes.classify(&args.path)),
        "guard": guard.as_ref().map(describe),
        "profile_fetches": store.fetch_count(),
        "navigations": navigator.navigations(),
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string()));
}

fn describe(outcome: &GuardOutcome) -> String {
    match outcome {
        GuardOutcome::LoginPage => "login-page".to_owned(),
        GuardOutcome::Allowed => "allowed".to_owned(),
        GuardOutcome::Redirected(path) => format!("redirected:{path}"),
        GuardOutcome::Suppressed => "suppressed".to_owned(),
    }
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
