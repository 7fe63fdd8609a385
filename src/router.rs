//! Client-side navigation targets

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One screen of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Signup,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    Profile,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Landing,
        Route::Login,
        Route::Signup,
        Route::ForgotPassword,
        Route::ResetPassword,
        Route::Dashboard,
        Route::Profile,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/auth/login",
            Route::Signup => "/auth/signup",
            Route::ForgotPassword => "/auth/forgot-password",
            Route::ResetPassword => "/auth/reset-password",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = Error;

    /// Parse a path; a trailing slash, query or fragment is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        Route::ALL
            .into_iter()
            .find(|route| route.path() == path)
            .ok_or_else(|| Error::general(format!("Unknown route: {}", s)))
    }
}
