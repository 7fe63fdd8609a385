//! Form state shared by every screen

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Where a form is in its submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Success,
    Error,
}

/// Inputs and feedback of one form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState<F> {
    /// Current input values
    pub fields: F,
    /// Error text on display
    pub error: Option<String>,
    /// Success text on display
    pub success: Option<String>,
    submitting: bool,
    generation: u64,
}

impl<F> FormState<F> {
    pub fn status(&self) -> FormStatus {
        if self.submitting {
            FormStatus::Submitting
        } else if self.error.is_some() {
            FormStatus::Error
        } else if self.success.is_some() {
            FormStatus::Success
        } else {
            FormStatus::Idle
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The submit control, labelled for the current state
    pub fn button(&self, idle: &'static str, busy: &'static str) -> SubmitButton {
        SubmitButton {
            label: if self.submitting { busy } else { idle },
            disabled: self.submitting,
        }
    }
}

/// Rendering state of a submit control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitButton {
    pub label: &'static str,
    pub disabled: bool,
}

/// Shared handle to a form; clones see the same state.
///
/// The lock is only held for field access, never across a remote call.
#[derive(Debug, Default)]
pub struct Form<F> {
    inner: Arc<Mutex<FormState<F>>>,
}

impl<F> Clone for Form<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Clone> Form<F> {
    pub fn new(fields: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FormState {
                fields,
                error: None,
                success: None,
                submitting: false,
                generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState<F>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> FormState<F> {
        self.lock().clone()
    }

    /// Change input values
    pub fn edit(&self, f: impl FnOnce(&mut F)) {
        f(&mut self.lock().fields);
    }

    /// Start a submission: clears previous feedback and marks the form busy.
    ///
    /// Returns `None` while another submission is in flight.
    pub fn begin(&self) -> Option<Submission<F>> {
        let mut state = self.lock();
        if state.submitting {
            return None;
        }
        state.submitting = true;
        state.error = None;
        state.success = None;
        state.generation += 1;

        Some(Submission {
            form: self.clone(),
            generation: state.generation,
        })
    }

    /// Drop the success text, unless a later submission has replaced it
    pub fn clear_success(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.success = None;
        }
    }
}

/// An in-flight submission. Dropping it marks the form idle again, whatever
/// path the handler took.
#[derive(Debug)]
pub struct Submission<F: Clone> {
    form: Form<F>,
    generation: u64,
}

impl<F: Clone> Submission<F> {
    /// Input values at the time of the call
    pub fn fields(&self) -> F {
        self.form.lock().fields.clone()
    }

    pub fn edit(&self, f: impl FnOnce(&mut F)) {
        self.form.edit(f);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.form.lock().error = Some(message.into());
    }

    pub fn succeed(&self, message: impl Into<String>) {
        self.form.lock().success = Some(message.into());
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<F: Clone> Drop for Submission<F> {
    fn drop(&mut self) {
        self.form.lock().submitting = false;
    }
}
