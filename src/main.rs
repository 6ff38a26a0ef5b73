use anyhow::Result;
use clap::{Parser, Subcommand};

use beacon_agent_lib::api::{ProviderSignIn, SignUpForm, SignUpOutcome};
use beacon_agent_lib::commands::{self, LoginRequest};
use beacon_agent_lib::config::AgentConfig;
use beacon_agent_lib::platform::desktop::ConsoleBrowser;
use beacon_agent_lib::utils::logging;
use beacon_agent_lib::AppState;

#[derive(Parser)]
#[command(name = "beacon-agent", version, about = "Background location reporting agent")]
struct Cli {
    /// Backend base URL, overrides BEACON_SERVER_URL
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BEACON_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BEACON_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Sign in through the identity provider
    ProviderLogin,
    /// Stop tracking and forget the stored session
    Logout,
    /// Show session and tracking state
    Status,
    /// Fetch the user profile
    Profile,
    /// Report location until interrupted
    Track,
    /// Stop tracking and clear the tracking flag
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = AgentConfig::from_env();
    if let Some(url) = cli.server_url {
        config.server_url = url.trim_end_matches('/').to_string();
    }

    let state = AppState::new(config)?;

    match cli.command {
        Command::Login { email, password } => {
            let status = commands::login(&state, LoginRequest { email, password }).await?;
            println!("Signed in to {}", status.server_url);
        }
        Command::Signup { email, password, confirm_password, full_name, phone, address } => {
            let form = SignUpForm { email, password, confirm_password, full_name, phone, address };
            match commands::signup(&state, form).await? {
                SignUpOutcome::SignedIn => println!("Account created and signed in"),
                SignUpOutcome::AccountCreated => println!("Account created, sign in to continue"),
            }
        }
        Command::ProviderLogin => match commands::provider_login(&state, &ConsoleBrowser).await? {
            ProviderSignIn::SignedIn => println!("Signed in"),
            ProviderSignIn::Cancelled => println!("Sign-in cancelled"),
        },
        Command::Logout => {
            commands::logout(&state).await?;
            println!("Signed out");
        }
        Command::Status => {
            let auth = commands::get_auth_status(&state).await?;
            let tracking = commands::get_tracking_status(&state).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "auth": auth, "tracking": tracking }))?
            );
        }
        Command::Profile => {
            let profile = commands::get_profile(&state).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Track => {
            let status = commands::start_tracking(&state).await?;
            println!("Tracking every {}s, press Ctrl-C to stop", status.interval_seconds);

            tokio::signal::ctrl_c().await?;

            commands::stop_tracking(&state).await?;
            println!("Tracking stopped");
        }
        Command::Stop => {
            commands::stop_tracking(&state).await?;
            println!("Tracking stopped");
        }
    }

    Ok(())
}
