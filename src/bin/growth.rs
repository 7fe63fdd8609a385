use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use growth_app::config::{AppConfig, SESSION_FILE_VAR};
use growth_app::controllers::{View, NO_ACTIVITY, SECTIONS};
use growth_app::error::{Error, Result};
use growth_app::{App, Route, SessionSnapshot};

/// Session file used when GROWTH_SESSION_FILE is not set
const DEFAULT_SESSION_FILE: &str = ".growth-session.json";

/// How long to wait for an auth event after a successful call
const EVENT_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[clap(name = "growth", version)]
#[clap(about = "Growth account and profile client", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account
    Signup {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Request a password reset email
    ForgotPassword {
        #[clap(long)]
        email: String,
    },
    /// Set a new password for the current session
    ResetPassword {
        #[clap(long)]
        password: String,
    },
    /// Show the dashboard
    Dashboard,
    /// Show or edit the profile
    Profile {
        #[clap(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Open a screen by path, e.g. /auth/login
    Open { path: String },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Show the profile (default)
    Show,
    /// Save bio, location and website; unset flags keep their value
    Update {
        #[clap(long)]
        bio: Option<String>,
        #[clap(long)]
        location: Option<String>,
        #[clap(long)]
        website: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err.message());
            process::exit(2);
        }
    };
    if config.options.session_file.is_none() {
        config.options = config
            .options
            .with_session_file(PathBuf::from(DEFAULT_SESSION_FILE));
    }
    log::debug!(
        "Session file: {:?} (override with {})",
        config.options.session_file,
        SESSION_FILE_VAR
    );

    if let Err(err) = run(cli, config).await {
        eprintln!("{}", err.message());
        process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let mut app = App::start(config)?;
    app.provider().wait_until_loaded().await;

    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let signup = app.signup().clone();
            signup.set_full_name(&name);
            signup.set_email(&email);
            signup.set_password(&password);
            match signup.submit().await {
                Some(route) => {
                    settle(&app, |s| s.is_authenticated()).await;
                    app.navigate(route).await;
                }
                None => {
                    app.navigate(Route::Signup).await;
                }
            }
        }
        Commands::Login { email, password } => {
            let login = app.login().clone();
            login.set_email(&email);
            login.set_password(&password);
            match login.submit().await {
                Some(route) => {
                    settle(&app, |s| s.is_authenticated()).await;
                    app.navigate(route).await;
                }
                None => {
                    app.navigate(Route::Login).await;
                }
            }
        }
        Commands::Logout => {
            let dashboard = app.dashboard().clone();
            match dashboard.logout().await {
                Some(route) => {
                    settle(&app, |s| !s.is_authenticated()).await;
                    app.navigate(route).await;
                }
                None => {
                    app.navigate(Route::Dashboard).await;
                }
            }
        }
        Commands::ForgotPassword { email } => {
            let forgot = app.forgot_password().clone();
            forgot.set_email(&email);
            forgot.submit().await;
            app.navigate(Route::ForgotPassword).await;
        }
        Commands::ResetPassword { password } => {
            let reset = app.reset_password().clone();
            reset.set_password(&password);
            reset.submit().await;
            app.navigate(Route::ResetPassword).await;
        }
        Commands::Dashboard => {
            app.navigate(Route::Dashboard).await;
        }
        Commands::Profile { action } => {
            let route = app.navigate(Route::Profile).await;
            if let (Route::Profile, Some(ProfileAction::Update { bio, location, website })) =
                (route, action)
            {
                let profile = app.profile().clone();
                if !profile.is_loaded() {
                    render(&app);
                    return Err(Error::general(
                        "The stored profile could not be loaded, nothing was saved",
                    ));
                }
                if let Some(bio) = bio {
                    profile.set_bio(&bio);
                }
                if let Some(location) = location {
                    profile.set_location(&location);
                }
                if let Some(website) = website {
                    profile.set_website(&website);
                }
                profile.submit().await;
            }
        }
        Commands::Open { path } => {
            app.open(&path).await?;
        }
    }

    render(&app);
    app.shutdown();
    Ok(())
}

/// Give the session provider a moment to apply the event of the last call
async fn settle<F>(app: &App, predicate: F)
where
    F: Fn(&SessionSnapshot) -> bool,
{
    if tokio::time::timeout(EVENT_WAIT, app.provider().wait_for(predicate))
        .await
        .is_err()
    {
        log::warn!("No auth event within {:?}", EVENT_WAIT);
    }
}

fn feedback(error: &Option<String>, success: &Option<String>) {
    if let Some(error) = error {
        println!("  ! {}", error);
    }
    if let Some(success) = success {
        println!("  * {}", success);
    }
}

fn render(app: &App) {
    let route = app.current();
    println!("[{}]", route);

    match route {
        Route::Landing => {
            if let View::Page(page) = app.landing().view() {
                println!("{}", page.brand);
                println!("{}", page.headline);
                println!("{}", page.tagline);
                for (title, text) in page.features.iter() {
                    println!("  - {}: {}", title, text);
                }
                println!("Sign in: {}  Get started: {}", page.sign_in, page.sign_up);
            }
        }
        Route::Login => {
            if let View::Page(page) = app.login().view() {
                println!("Sign in to your account");
                println!("  email: {}", page.form.fields.email);
                feedback(&page.form.error, &page.form.success);
                println!("Forgot your password? {}", Route::ForgotPassword);
            }
        }
        Route::Signup => {
            if let View::Page(page) = app.signup().view() {
                println!("Create your account");
                println!("  full name: {}", page.form.fields.full_name);
                println!("  email: {}", page.form.fields.email);
                feedback(&page.form.error, &page.form.success);
            }
        }
        Route::ForgotPassword => {
            if let View::Page(page) = app.forgot_password().view() {
                println!("Reset your password");
                feedback(&page.form.error, &page.form.success);
            }
        }
        Route::ResetPassword => {
            if let View::Page(page) = app.reset_password().view() {
                println!("Set a new password");
                feedback(&page.form.error, &page.form.success);
            }
        }
        Route::Dashboard => match app.dashboard().view() {
            View::Page(page) => {
                println!("{}", page.greeting);
                if let Some(name) = &page.display_name {
                    println!("  name: {}", name);
                }
                for (title, text) in SECTIONS.iter() {
                    println!("  - {}: {}", title, text);
                }
                println!("Recent Activity: {}", NO_ACTIVITY);
                feedback(&page.error, &None);
                println!("Profile: {}", page.profile);
            }
            View::Loading => println!("Loading..."),
            View::Redirect(to) => println!("-> {}", to),
        },
        Route::Profile => match app.profile().view() {
            View::Page(page) => {
                println!("Profile");
                println!("  email: {}", page.email.as_deref().unwrap_or_default());
                println!("  user id: {}", page.user_id);
                println!("  bio: {}", page.form.fields.bio);
                println!("  location: {}", page.form.fields.location);
                println!("  website: {}", page.form.fields.website);
                feedback(&page.form.error, &page.form.success);
                println!("Dashboard: {}", page.dashboard);
            }
            View::Loading => println!("Loading..."),
            View::Redirect(to) => println!("-> {}", to),
        },
    }
}
