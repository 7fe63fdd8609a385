//! The application context: backend, session provider and screens

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::Auth;
use crate::backend::{Backend, SupabaseBackend};
use crate::config::AppConfig;
use crate::controllers::{
    DashboardController, ForgotPasswordController, LandingController, LoginController,
    ProfileController, ResetPasswordController, SessionWatch, SignupController,
};
use crate::error::Result;
use crate::provider::{SessionProvider, SessionSnapshot};
use crate::router::Route;
use crate::Supabase;

/// Redirect chains longer than this are cut off
const MAX_REDIRECTS: usize = 4;

/// Everything the screens share, from start to [`App::shutdown`]
pub struct App {
    backend: Arc<dyn Backend>,
    auth: Option<Auth>,
    provider: SessionProvider,
    current: watch::Sender<Route>,
    loader: Option<JoinHandle<()>>,
    landing: LandingController,
    login: LoginController,
    signup: SignupController,
    forgot_password: ForgotPasswordController,
    reset_password: ResetPasswordController,
    dashboard: DashboardController,
    profile: ProfileController,
}

impl App {
    /// Connect to the configured Supabase project and start tracking the
    /// session. Must run inside a tokio runtime.
    pub fn start(config: AppConfig) -> Result<Self> {
        let supabase = Supabase::new_with_options(
            &config.supabase_url,
            &config.supabase_anon_key,
            config.options.clone(),
        )?;
        let auth = supabase.auth().clone();
        auth.start_auto_refresh();

        log::info!("Starting against {}", config.supabase_url);
        let mut app = Self::with_backend(Arc::new(SupabaseBackend::new(supabase)));
        app.auth = Some(auth);
        Ok(app)
    }

    /// Build the application around any backend
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        let provider = SessionProvider::start(Arc::clone(&backend));
        let session = provider.subscribe();
        let dashboard = DashboardController::new(Arc::clone(&backend), session.clone());
        let profile = ProfileController::new(Arc::clone(&backend), session.clone());
        let (current, route) = watch::channel(Route::Landing);
        let loader = tokio::spawn(follow_identity(
            session.clone(),
            route,
            dashboard.clone(),
            profile.clone(),
        ));

        Self {
            landing: LandingController::new(session.clone()),
            login: LoginController::new(Arc::clone(&backend), session.clone()),
            signup: SignupController::new(Arc::clone(&backend), session.clone()),
            forgot_password: ForgotPasswordController::new(Arc::clone(&backend), session.clone()),
            reset_password: ResetPasswordController::new(Arc::clone(&backend), session.clone()),
            dashboard,
            profile,
            backend,
            auth: None,
            provider,
            current,
            loader: Some(loader),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn provider(&self) -> &SessionProvider {
        &self.provider
    }

    pub fn session(&self) -> SessionSnapshot {
        self.provider.snapshot()
    }

    /// The screen on display
    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    /// Show `route`, following the screens' redirects, and run the screen's
    /// data loading. Returns the screen that ends up on display.
    pub async fn navigate(&mut self, route: Route) -> Route {
        let mut target = route;
        for _ in 0..MAX_REDIRECTS {
            match self.redirect_for(target) {
                Some(next) if next != target => {
                    log::debug!("{} redirects to {}", target, next);
                    target = next;
                }
                _ => break,
            }
        }
        self.current.send_replace(target);

        match target {
            Route::Dashboard => self.dashboard.load().await,
            Route::Profile => self.profile.load().await,
            _ => {}
        }

        target
    }

    /// Parse a path and navigate to it
    pub async fn open(&mut self, path: &str) -> Result<Route> {
        let route = path.parse::<Route>()?;
        Ok(self.navigate(route).await)
    }

    /// Re-evaluate the current screen after the session changed
    pub async fn refresh(&mut self) -> Route {
        self.navigate(self.current()).await
    }

    fn redirect_for(&self, route: Route) -> Option<Route> {
        match route {
            Route::Landing => self.landing.view().redirect(),
            Route::Login => self.login.view().redirect(),
            Route::Signup => self.signup.view().redirect(),
            Route::ForgotPassword => self.forgot_password.view().redirect(),
            Route::ResetPassword => self.reset_password.view().redirect(),
            Route::Dashboard => self.dashboard.view().redirect(),
            Route::Profile => self.profile.view().redirect(),
        }
    }

    pub fn landing(&self) -> &LandingController {
        &self.landing
    }

    pub fn login(&self) -> &LoginController {
        &self.login
    }

    pub fn signup(&self) -> &SignupController {
        &self.signup
    }

    pub fn forgot_password(&self) -> &ForgotPasswordController {
        &self.forgot_password
    }

    pub fn reset_password(&self) -> &ResetPasswordController {
        &self.reset_password
    }

    pub fn dashboard(&self) -> &DashboardController {
        &self.dashboard
    }

    pub fn profile(&self) -> &ProfileController {
        &self.profile
    }

    /// Stop the session provider, the screen loader and the token refresh task
    pub fn shutdown(mut self) {
        self.teardown();
        log::info!("Shut down");
    }

    fn teardown(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        self.provider.shutdown();
        if let Some(auth) = self.auth.take() {
            auth.stop_auto_refresh();
        }
    }
}

/// Run the data loading of the screen on display whenever a different user
/// signs in, e.g. once the session lookup finishes after the screen opened.
async fn follow_identity(
    mut session: SessionWatch,
    route: watch::Receiver<Route>,
    dashboard: DashboardController,
    profile: ProfileController,
) {
    let mut last: Option<String> = None;

    loop {
        let user = session.borrow_and_update().user_id().map(str::to_string);
        if user != last {
            last = user;
            if last.is_some() {
                let current = *route.borrow();
                log::debug!("Identity changed on {}", current);
                match current {
                    Route::Dashboard => dashboard.load().await,
                    Route::Profile => profile.load().await,
                    _ => {}
                }
            }
        }
        if session.changed().await.is_err() {
            break;
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.teardown();
    }
}
