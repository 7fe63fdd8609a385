use std::sync::Arc;

use super::{Access, Form, FormPage, SessionWatch, View, UNEXPECTED_ERROR};
use crate::backend::Backend;
use crate::router::Route;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupFields {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// `/auth/signup`
#[derive(Clone)]
pub struct SignupController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    form: Form<SignupFields>,
}

impl SignupController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            form: Form::new(SignupFields::default()),
        }
    }

    pub fn set_full_name(&self, full_name: &str) {
        self.form.edit(|f| f.full_name = full_name.to_string());
    }

    pub fn set_email(&self, email: &str) {
        self.form.edit(|f| f.email = email.to_string());
    }

    pub fn set_password(&self, password: &str) {
        self.form.edit(|f| f.password = password.to_string());
    }

    pub fn view(&self) -> View<FormPage<SignupFields>> {
        Access::Public.guard(&self.session.borrow(), || {
            let form = self.form.snapshot();
            FormPage {
                button: form.button("Create Account", "Creating account..."),
                form,
            }
        })
    }

    pub async fn submit(&self) -> Option<Route> {
        let submission = self.form.begin()?;
        let fields = submission.fields();

        match self
            .backend
            .sign_up(&fields.email, &fields.password, &fields.full_name)
            .await
        {
            Ok(outcome) => {
                if outcome.session.is_none() {
                    log::info!("Account created, email confirmation pending");
                }
                Some(Route::Dashboard)
            }
            Err(err) => {
                log::debug!("Sign up failed: {}", err);
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                None
            }
        }
    }
}
