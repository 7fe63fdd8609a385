use std::sync::{Arc, Mutex, PoisonError};

use super::{
    signed_in_user_id, Access, Form, FormState, SessionWatch, SubmitButton, View, UNEXPECTED_ERROR,
};
use crate::backend::Backend;
use crate::profile::UserRecord;
use crate::router::Route;

/// Placeholder sections of the dashboard
pub const SECTIONS: [(&str, &str); 3] = [
    ("Overview", "Get started with your growth journey"),
    ("Goals", "Set and track your personal goals"),
    ("Progress", "Monitor your achievements"),
];

pub const NO_ACTIVITY: &str = "No activity yet. Start by exploring the dashboard features.";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPage {
    /// "Welcome back, ..." line
    pub greeting: String,
    /// Name from the `users` row or the sign up metadata
    pub display_name: Option<String>,
    pub error: Option<String>,
    pub logout: SubmitButton,
    pub profile: Route,
}

/// `/dashboard`
#[derive(Clone)]
pub struct DashboardController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    logout: Form<()>,
    record: Arc<Mutex<Option<UserRecord>>>,
}

impl DashboardController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            logout: Form::new(()),
            record: Arc::new(Mutex::new(None)),
        }
    }

    pub fn view(&self) -> View<DashboardPage> {
        let session = self.session.borrow().clone();
        Access::RequireAuth.guard(&session, || {
            let form: FormState<()> = self.logout.snapshot();
            let record = self
                .record
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            let display_name = record
                .filter(|r| Some(r.id.as_str()) == session.user_id())
                .and_then(|r| r.full_name)
                .filter(|name| !name.is_empty())
                .or_else(|| {
                    session
                        .identity
                        .as_ref()
                        .and_then(|u| u.full_name())
                        .map(str::to_string)
                });

            DashboardPage {
                greeting: format!("Welcome back, {}", session.email().unwrap_or_default()),
                display_name,
                error: form.error.clone(),
                logout: form.button("Logout", "Logging out..."),
                profile: Route::Profile,
            }
        })
    }

    fn set_record(&self, record: Option<UserRecord>) {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = record;
    }

    /// Fetch the `users` row of the signed in user. A missing row or table
    /// only means there is no name to show.
    pub async fn load(&self) {
        self.set_record(None);
        let Some(user_id) = signed_in_user_id(&self.session) else {
            return;
        };

        match self.backend.get_user_data(&user_id).await {
            Ok(record) => self.set_record(Some(record)),
            Err(err) => {
                log::debug!("No user record for {}: {}", user_id, err);
                self.set_record(None);
            }
        }
    }

    /// Sign out and go back to the landing screen
    pub async fn logout(&self) -> Option<Route> {
        let submission = self.logout.begin()?;

        match self.backend.sign_out().await {
            Ok(()) => Some(Route::Landing),
            Err(err) => {
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                None
            }
        }
    }
}
