//! One controller per screen.
//!
//! A controller reads the session snapshot to decide between rendering and
//! redirecting, keeps its form state, and maps a submission to exactly one
//! [`Backend`](crate::backend::Backend) call. Controllers are cheap to clone;
//! clones share state, so a second click while a call is in flight is seen
//! and ignored.

mod dashboard;
mod forgot_password;
mod form;
mod landing;
mod login;
mod profile;
mod reset_password;
mod signup;

use tokio::sync::watch;

use crate::provider::SessionSnapshot;
use crate::router::Route;

pub use dashboard::{DashboardController, DashboardPage, NO_ACTIVITY, SECTIONS};
pub use forgot_password::{ForgotPasswordController, ForgotPasswordFields, RESET_EMAIL_SENT};
pub use form::{Form, FormState, FormStatus, SubmitButton, Submission};
pub use landing::{LandingController, LandingPage};
pub use login::{LoginController, LoginFields};
pub use profile::{
    ProfileController, ProfileFields, ProfilePage, LOAD_FAILED, PROFILE_UPDATED, SUCCESS_DISPLAY,
    UPDATE_FAILED,
};
pub use reset_password::{ResetPasswordController, ResetPasswordFields, PASSWORD_UPDATED};
pub use signup::{SignupController, SignupFields};

/// Shown when a handler fails for a reason the backend did not report
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Session state as seen by a controller
pub type SessionWatch = watch::Receiver<SessionSnapshot>;

/// Id of the signed in user, if any
fn signed_in_user_id(session: &SessionWatch) -> Option<String> {
    session.borrow().user_id().map(str::to_string)
}

/// What a screen shows right now
#[derive(Debug, Clone, PartialEq)]
pub enum View<P> {
    /// The session is still being looked up
    Loading,
    /// Render nothing and navigate elsewhere
    Redirect(Route),
    /// Render the page
    Page(P),
}

impl<P> View<P> {
    pub fn redirect(&self) -> Option<Route> {
        match self {
            View::Redirect(route) => Some(*route),
            _ => None,
        }
    }

    pub fn page(&self) -> Option<&P> {
        match self {
            View::Page(page) => Some(page),
            _ => None,
        }
    }
}

/// Who may see a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone
    Public,
    /// Signed in users; everyone else goes to the login screen
    RequireAuth,
    /// Visitors; signed in users go to the dashboard
    RequireAnonymous,
}

impl Access {
    /// Apply the redirect policy, building the page only when it is shown
    pub fn guard<P>(self, session: &SessionSnapshot, page: impl FnOnce() -> P) -> View<P> {
        match self {
            Access::Public => View::Page(page()),
            Access::RequireAuth if session.loading => View::Loading,
            Access::RequireAuth if !session.is_authenticated() => View::Redirect(Route::Login),
            Access::RequireAnonymous if !session.loading && session.is_authenticated() => {
                View::Redirect(Route::Dashboard)
            }
            _ => View::Page(page()),
        }
    }
}

/// A form screen's page: the form state and its submit control
#[derive(Debug, Clone, PartialEq)]
pub struct FormPage<F> {
    pub form: FormState<F>,
    pub button: SubmitButton,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn signed_in() -> SessionSnapshot {
        SessionSnapshot {
            identity: Some(serde_json::from_value::<User>(serde_json::json!({ "id": "u" })).unwrap()),
            loading: false,
        }
    }

    fn signed_out() -> SessionSnapshot {
        SessionSnapshot {
            identity: None,
            loading: false,
        }
    }

    #[test]
    fn protected_screens() {
        let loading = SessionSnapshot::default();
        assert_eq!(Access::RequireAuth.guard(&loading, || ()), View::Loading);
        assert_eq!(
            Access::RequireAuth.guard(&signed_out(), || ()),
            View::Redirect(Route::Login)
        );
        assert_eq!(Access::RequireAuth.guard(&signed_in(), || ()), View::Page(()));
    }

    #[test]
    fn anonymous_screens() {
        let loading = SessionSnapshot::default();
        assert_eq!(Access::RequireAnonymous.guard(&loading, || ()), View::Page(()));
        assert_eq!(
            Access::RequireAnonymous.guard(&signed_in(), || ()),
            View::Redirect(Route::Dashboard)
        );
        assert_eq!(Access::Public.guard(&signed_in(), || 1), View::Page(1));
    }
}
