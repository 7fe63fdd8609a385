use std::sync::Arc;

use super::{Access, Form, FormPage, SessionWatch, View, UNEXPECTED_ERROR};
use crate::backend::Backend;
use crate::router::Route;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginFields {
    pub email: String,
    pub password: String,
}

/// `/auth/login`
#[derive(Clone)]
pub struct LoginController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    form: Form<LoginFields>,
}

impl LoginController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            form: Form::new(LoginFields::default()),
        }
    }

    pub fn set_email(&self, email: &str) {
        self.form.edit(|f| f.email = email.to_string());
    }

    pub fn set_password(&self, password: &str) {
        self.form.edit(|f| f.password = password.to_string());
    }

    pub fn view(&self) -> View<FormPage<LoginFields>> {
        Access::Public.guard(&self.session.borrow(), || {
            let form = self.form.snapshot();
            FormPage {
                button: form.button("Sign In", "Signing in..."),
                form,
            }
        })
    }

    /// Sign in; on success the caller navigates to the returned route. The
    /// session itself reaches the provider through the auth events.
    pub async fn submit(&self) -> Option<Route> {
        let submission = self.form.begin()?;
        let fields = submission.fields();

        match self.backend.sign_in(&fields.email, &fields.password).await {
            Ok(_) => Some(Route::Dashboard),
            Err(err) => {
                log::debug!("Sign in failed: {}", err);
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                None
            }
        }
    }
}
