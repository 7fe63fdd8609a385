use std::sync::Arc;

use super::{Access, Form, FormPage, SessionWatch, View, UNEXPECTED_ERROR};
use crate::backend::Backend;

pub const RESET_EMAIL_SENT: &str = "Check your email for password reset instructions";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForgotPasswordFields {
    pub email: String,
}

/// `/auth/forgot-password`
///
/// Requests are handed to the backend as they are; domain checks and rate
/// limits are the backend's business.
#[derive(Clone)]
pub struct ForgotPasswordController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    form: Form<ForgotPasswordFields>,
}

impl ForgotPasswordController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            form: Form::new(ForgotPasswordFields::default()),
        }
    }

    pub fn set_email(&self, email: &str) {
        self.form.edit(|f| f.email = email.to_string());
    }

    pub fn view(&self) -> View<FormPage<ForgotPasswordFields>> {
        Access::Public.guard(&self.session.borrow(), || {
            let form = self.form.snapshot();
            FormPage {
                button: form.button("Send Reset Link", "Sending..."),
                form,
            }
        })
    }

    /// Returns true when the request was accepted
    pub async fn submit(&self) -> bool {
        let Some(submission) = self.form.begin() else {
            return false;
        };
        let email = submission.fields().email;

        match self.backend.reset_password_request(&email).await {
            Ok(()) => {
                submission.succeed(RESET_EMAIL_SENT);
                submission.edit(|f| f.email.clear());
                true
            }
            Err(err) => {
                log::debug!("Password reset request failed: {}", err);
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                false
            }
        }
    }
}
