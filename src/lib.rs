//! Cycle calendar and period-day reconciliation core for the Moonly app.
//!
//! `domain` holds the pure date math and classification rules,
//! `application` the stateful services that drive the remote store, and
//! `infrastructure` the HTTP client, configuration and session storage.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::async_result::AsyncResult;
pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::cycle_overview::CycleOverview;
pub use application::period_editor::PeriodEditor;
pub use application::period_reconciler::{FlightStatus, PeriodDiff, SelectionReconciler};
pub use application::retry::RetryPolicy;
pub use domain::cycle_classifier::{CalendarCell, CycleFacts, DayDisplay};
pub use domain::models::{
    CalendarDate, DateRange, FertileWindow, OvulationInfo, PeriodDaySet, YearMonth,
};
pub use domain::session_gate::Route;
pub use infrastructure::config::{AppConfig, TodayProvider};
pub use infrastructure::cycle_api_client::{CycleApiClient, ReqwestCycleApiClient};
pub use infrastructure::error::InfraError;
pub use infrastructure::session_store::{
    route_session, InMemorySessionStore, KeyringSessionStore, SessionSnapshot, SessionStore,
};
