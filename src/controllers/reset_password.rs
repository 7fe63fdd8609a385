use std::sync::Arc;

use super::{Access, Form, FormPage, SessionWatch, View, UNEXPECTED_ERROR};
use crate::backend::Backend;

pub const PASSWORD_UPDATED: &str = "Password updated successfully";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetPasswordFields {
    pub password: String,
}

/// `/auth/reset-password`: sets a new password for the session opened by
/// the reset link.
#[derive(Clone)]
pub struct ResetPasswordController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    form: Form<ResetPasswordFields>,
}

impl ResetPasswordController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            form: Form::new(ResetPasswordFields::default()),
        }
    }

    pub fn set_password(&self, password: &str) {
        self.form.edit(|f| f.password = password.to_string());
    }

    pub fn view(&self) -> View<FormPage<ResetPasswordFields>> {
        Access::Public.guard(&self.session.borrow(), || {
            let form = self.form.snapshot();
            FormPage {
                button: form.button("Update Password", "Updating..."),
                form,
            }
        })
    }

    /// Returns true when the password was changed
    pub async fn submit(&self) -> bool {
        let Some(submission) = self.form.begin() else {
            return false;
        };
        let password = submission.fields().password;

        match self.backend.update_password(&password).await {
            Ok(_) => {
                submission.succeed(PASSWORD_UPDATED);
                submission.edit(|f| f.password.clear());
                true
            }
            Err(err) => {
                log::debug!("Password update failed: {}", err);
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                false
            }
        }
    }
}
