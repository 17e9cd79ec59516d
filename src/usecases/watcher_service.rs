//! Watcher (Daemon) use case: poll grades, inbox and schedule periodically and alert on changes.
//!
//! Orchestrates MagisterGateway, AuthService, NotifierPort and StatePort. Does not block the main
//! thread; uses tokio::time::sleep between cycles. A cycle never fails the loop: errors are logged,
//! an expired token triggers a re-login for the next cycle.

use crate::domain::changes::{diff_grades, diff_messages, diff_schedule};
use crate::domain::{Alert, DomainError, WatchState, find_inbox};
use crate::ports::{MagisterGateway, NotifierPort, StatePort};
use crate::usecases::auth_service::AuthService;
use chrono::{Days, Local, NaiveDate};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// How many of the latest grades are compared per cycle.
const GRADE_WINDOW: u32 = 10;
/// How many of the latest inbox messages are compared per cycle.
const MESSAGE_WINDOW: u32 = 10;

/// Result of one `check_updates` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All sources polled; `alerts` notifications were dispatched.
    Checked { alerts: usize },
    /// No token could be obtained; nothing was polled.
    NoToken,
    /// The token was rejected and a new one was obtained for the next cycle.
    TokenRefreshed,
    /// Polling failed (network, API, or a failed re-login).
    Failed,
}

/// Watcher service. Runs a loop: check updates -> notify -> persist state -> sleep.
pub struct WatcherService {
    gateway: Arc<dyn MagisterGateway>,
    auth: Arc<AuthService>,
    notifier: Arc<dyn NotifierPort>,
    state_store: Arc<dyn StatePort>,
    state: Mutex<WatchState>,
    /// Sleep duration between cycles.
    cycle_sleep: Duration,
}

impl WatcherService {
    /// Build the watcher, restoring state persisted by a previous run.
    pub async fn new(
        gateway: Arc<dyn MagisterGateway>,
        auth: Arc<AuthService>,
        notifier: Arc<dyn NotifierPort>,
        state_store: Arc<dyn StatePort>,
        cycle_sleep: Duration,
    ) -> Result<Self, DomainError> {
        let state = state_store.load().await?;
        if state.initialized {
            info!(
                grades = state.seen_grade_ids.len(),
                messages = state.seen_message_ids.len(),
                "restored watcher state"
            );
        }
        Ok(Self {
            gateway,
            auth,
            notifier,
            state_store,
            state: Mutex::new(state),
            cycle_sleep,
        })
    }

    /// Run until Ctrl-C.
    pub async fn run_loop(&self) -> Result<(), DomainError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run cycles until `shutdown` resolves. A cycle in flight is abandoned on shutdown.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<(), DomainError> {
        info!(
            cycle_secs = self.cycle_sleep.as_secs(),
            "Magister watcher started"
        );
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = self.check_updates() => {}
                _ = &mut shutdown => {
                    info!("watcher stopped during a cycle");
                    return Ok(());
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.cycle_sleep) => {}
                _ = &mut shutdown => {
                    info!("watcher stopped");
                    return Ok(());
                }
            }
        }
    }

    /// One polling cycle.
    pub async fn check_updates(&self) -> CycleOutcome {
        let token = match self.auth.current_token().await {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "no usable token; skipping cycle");
                return CycleOutcome::NoToken;
            }
        };
        self.gateway.set_token(&token).await;

        let mut state = self.state.lock().await;
        let result = self.poll(&mut state).await;

        let outcome = match result {
            Ok(alerts) => {
                if !state.initialized {
                    info!(
                        grades = state.seen_grade_ids.len(),
                        messages = state.seen_message_ids.len(),
                        appointments = state.schedule_hashes.len(),
                        "initialized baseline"
                    );
                    state.initialized = true;
                }
                CycleOutcome::Checked { alerts }
            }
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "token seems invalid; refreshing");
                match self.auth.refresh().await {
                    Ok(token) => {
                        self.gateway.set_token(&token).await;
                        CycleOutcome::TokenRefreshed
                    }
                    Err(e) => {
                        error!(error = %e, "could not refresh token");
                        CycleOutcome::Failed
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "error during check");
                CycleOutcome::Failed
            }
        };

        // Persist partial progress too: alerts already sent must not repeat.
        if let Err(e) = self.state_store.save(&state).await {
            warn!(error = %e, "failed to persist watcher state");
        }
        outcome
    }

    async fn poll(&self, state: &mut WatchState) -> Result<usize, DomainError> {
        let mut sent = 0;

        let grades = self.gateway.get_grades(GRADE_WINDOW).await?;
        for alert in diff_grades(state, &grades) {
            self.dispatch(&alert).await;
            sent += 1;
        }

        let folders = self.gateway.get_folders().await?;
        if let Some(inbox) = find_inbox(&folders) {
            let messages = self.gateway.get_messages(inbox.id, MESSAGE_WINDOW).await?;
            for alert in diff_messages(state, &messages) {
                self.dispatch(&alert).await;
                sent += 1;
            }
        }

        let (start, end) = schedule_window(Local::now().date_naive());
        let appointments = self.gateway.get_schedule(start, end).await?;
        for alert in diff_schedule(state, &appointments) {
            self.dispatch(&alert).await;
            sent += 1;
        }

        Ok(sent)
    }

    /// Notification failures are logged and never abort the cycle.
    async fn dispatch(&self, alert: &Alert) {
        info!(alert = %alert, "change detected");
        if let Err(e) = self.notifier.notify(&alert.to_string()).await {
            warn!(error = %e, "failed to send notification");
        }
    }
}

/// Today and tomorrow.
fn schedule_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today.checked_add_days(Days::new(1)).unwrap_or(today))
}
