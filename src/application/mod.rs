pub mod async_result;
pub mod bootstrap;
pub mod cycle_overview;
pub mod period_editor;
pub mod period_reconciler;
pub mod retry;

#[cfg(test)]
pub(crate) mod fake_client;
