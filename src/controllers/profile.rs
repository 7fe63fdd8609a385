use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{
    signed_in_user_id, Access, Form, FormState, SessionWatch, SubmitButton, View, UNEXPECTED_ERROR,
};
use crate::backend::Backend;
use crate::profile::{Profile, ProfileUpdate};
use crate::router::Route;

pub const PROFILE_UPDATED: &str = "Profile updated successfully";
pub const LOAD_FAILED: &str = "Failed to load profile";
pub const UPDATE_FAILED: &str = "Failed to update profile";

/// How long the update confirmation stays up
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub bio: String,
    pub location: String,
    pub website: String,
}

impl From<&Profile> for ProfileFields {
    fn from(profile: &Profile) -> Self {
        Self {
            bio: profile.bio.clone().unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePage {
    pub email: Option<String>,
    pub user_id: String,
    pub form: FormState<ProfileFields>,
    pub button: SubmitButton,
    pub dashboard: Route,
}

/// `/profile`
#[derive(Clone)]
pub struct ProfileController {
    backend: Arc<dyn Backend>,
    session: SessionWatch,
    form: Form<ProfileFields>,
    /// User id the fields were loaded for
    loaded_for: Arc<Mutex<Option<String>>>,
}

impl ProfileController {
    pub fn new(backend: Arc<dyn Backend>, session: SessionWatch) -> Self {
        Self {
            backend,
            session,
            form: Form::new(ProfileFields::default()),
            loaded_for: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_bio(&self, bio: &str) {
        self.form.edit(|f| f.bio = bio.to_string());
    }

    pub fn set_location(&self, location: &str) {
        self.form.edit(|f| f.location = location.to_string());
    }

    pub fn set_website(&self, website: &str) {
        self.form.edit(|f| f.website = website.to_string());
    }

    pub fn view(&self) -> View<ProfilePage> {
        let session = self.session.borrow().clone();
        Access::RequireAuth.guard(&session, || {
            let form = self.form.snapshot();
            let user_id = session.user_id().unwrap_or_default().to_string();
            let mut button = form.button("Update Profile", "Updating...");
            button.disabled |= !self.is_loaded_for(&user_id);
            ProfilePage {
                email: session.email().map(str::to_string),
                user_id,
                button,
                form,
                dashboard: Route::Dashboard,
            }
        })
    }

    fn loaded_user(&self) -> Option<String> {
        self.loaded_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_loaded_for(&self, user_id: &str) -> bool {
        self.loaded_user().as_deref() == Some(user_id)
    }

    /// Whether the form holds the stored profile of the signed in user
    pub fn is_loaded(&self) -> bool {
        signed_in_user_id(&self.session).map_or(false, |id| self.is_loaded_for(&id))
    }

    /// Fill the form from the stored profile of the signed in user. Does
    /// nothing until the identity is known or once the fields are loaded;
    /// a failed load is tried again on the next call.
    pub async fn load(&self) {
        let Some(user_id) = signed_in_user_id(&self.session) else {
            return;
        };

        if self.is_loaded_for(&user_id) {
            return;
        }
        let Some(submission) = self.form.begin() else {
            return;
        };

        // Fields left from another user are never shown or saved for this one.
        self.loaded_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        submission.edit(|f| *f = ProfileFields::default());

        match self.backend.get_profile(&user_id).await {
            Ok(profile) => {
                let fields = ProfileFields::from(&profile);
                submission.edit(|f| *f = fields);
                *self
                    .loaded_for
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(user_id);
            }
            Err(err) => {
                log::debug!("Loading profile of {} failed: {}", user_id, err);
                submission.fail(err.user_message(LOAD_FAILED));
            }
        }
    }

    /// Save all three fields. Returns true on success; the confirmation
    /// clears itself after [`SUCCESS_DISPLAY`]. Refused until the stored
    /// profile of the signed in user has been loaded.
    pub async fn submit(&self) -> bool {
        let Some(user_id) = signed_in_user_id(&self.session) else {
            return false;
        };
        if !self.is_loaded_for(&user_id) {
            log::debug!("Profile of {} not loaded, refusing to save", user_id);
            return false;
        }
        let Some(submission) = self.form.begin() else {
            return false;
        };
        let fields = submission.fields();
        let update = ProfileUpdate::all(&fields.bio, &fields.location, &fields.website);

        match self.backend.update_profile(&user_id, &update).await {
            Ok(()) => {
                submission.succeed(PROFILE_UPDATED);

                let form = self.form.clone();
                let generation = submission.generation();
                tokio::spawn(async move {
                    tokio::time::sleep(SUCCESS_DISPLAY).await;
                    form.clear_success(generation);
                });
                true
            }
            Err(err) => {
                log::debug!("Updating profile of {} failed: {}", user_id, err);
                submission.fail(err.user_message(UPDATE_FAILED));
                false
            }
        }
    }

    /// Sign out and go back to the landing screen
    pub async fn logout(&self) -> Option<Route> {
        let submission = self.form.begin()?;

        match self.backend.sign_out().await {
            Ok(()) => Some(Route::Landing),
            Err(err) => {
                submission.fail(err.user_message(UNEXPECTED_ERROR));
                None
            }
        }
    }
}
