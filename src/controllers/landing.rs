use super::{Access, SessionWatch, View};
use crate::router::Route;

/// Static content of the landing screen
#[derive(Debug, Clone, PartialEq)]
pub struct LandingPage {
    pub brand: &'static str,
    pub headline: &'static str,
    pub tagline: &'static str,
    pub features: [(&'static str, &'static str); 3],
    pub sign_in: Route,
    pub sign_up: Route,
}

impl Default for LandingPage {
    fn default() -> Self {
        Self {
            brand: "Growth",
            headline: "Your Personal Growth Journey Starts Here",
            tagline: "Track, manage, and achieve your personal and professional goals with our comprehensive growth platform.",
            features: [
                (
                    "Track Progress",
                    "Monitor your achievements and stay motivated on your growth journey.",
                ),
                (
                    "Set Goals",
                    "Define clear, measurable goals and work towards them systematically.",
                ),
                (
                    "Stay Organized",
                    "Keep all your growth initiatives organized in one place.",
                ),
            ],
            sign_in: Route::Login,
            sign_up: Route::Signup,
        }
    }
}

/// `/`: shown to visitors, signed in users go to the dashboard
#[derive(Clone)]
pub struct LandingController {
    session: SessionWatch,
}

impl LandingController {
    pub fn new(session: SessionWatch) -> Self {
        Self { session }
    }

    pub fn view(&self) -> View<LandingPage> {
        Access::RequireAnonymous.guard(&self.session.borrow(), LandingPage::default)
    }
}
