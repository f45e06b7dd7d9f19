use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Onboarding,
    Home,
}

pub fn route(is_authenticated: bool, onboarding_complete: bool) -> Route {
    match (is_authenticated, onboarding_complete) {
        (false, _) => Route::Login,
        (true, false) => Route::Onboarding,
        (true, true) => Route::Home,
    }
}
