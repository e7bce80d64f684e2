//! expense-sync: live expense session for one account
//!
//! Signs in the configured account (creating it on first run), opens the
//! expense and category subscriptions and logs a dashboard summary plus
//! budget alerts whenever the expense view changes.
//!
//! ## Configuration
//! - EXPENSE_SYNC_CONFIG: YAML config file (optional)
//! - EXPENSE_SYNC__STORAGE__TYPE: `memory` (default) or `sqlite`
//! - EXPENSE_SYNC_EMAIL / EXPENSE_SYNC_PASSWORD: account credentials
//! - EXPENSE_SYNC_FIRST_NAME / EXPENSE_SYNC_LAST_NAME: used on first sign-up

use chrono::Local;
use tracing::{info, warn};

use expense_sync::auth::{AuthError, AuthService, MemoryAuthService};
use expense_sync::config::{
    Config, ACCOUNT_EMAIL_ENV_VAR, ACCOUNT_FIRST_NAME_ENV_VAR, ACCOUNT_LAST_NAME_ENV_VAR,
    ACCOUNT_PASSWORD_ENV_VAR,
};
use expense_sync::session::{sign_up, Session, SignUp};
use expense_sync::storage::init_storage;
use expense_sync::utils::bootstrap::{init_tracing, shutdown_signal};
use expense_sync::views::{budget_alerts, summarize};

fn required_env(name: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    std::env::var(name).map_err(|_| format!("{} must be set", name).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = Config::load(None)?;
    let store = init_storage(&config.storage).await?;
    let auth = MemoryAuthService::new(&config.auth)?;

    let email = required_env(ACCOUNT_EMAIL_ENV_VAR)?;
    let password = required_env(ACCOUNT_PASSWORD_ENV_VAR)?;

    let identity = match auth.sign_in(&email, &password).await {
        Ok(identity) => identity,
        Err(AuthError::UserNotFound { .. }) => {
            info!(email = %email, "No account found, signing up");
            let form = SignUp {
                first_name: std::env::var(ACCOUNT_FIRST_NAME_ENV_VAR).unwrap_or_default(),
                last_name: std::env::var(ACCOUNT_LAST_NAME_ENV_VAR).unwrap_or_default(),
                email: email.clone(),
                confirm_password: password.clone(),
                password,
            };
            sign_up(&auth, store.as_ref(), form).await?
        }
        Err(e) => {
            warn!(email = %email, "{}", e.user_message());
            return Err(e.into());
        }
    };

    let session = Session::start(store, identity);
    info!(uid = %session.identity().uid, "expense-sync started");

    let mut expenses = session.expenses().view();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = expenses.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = expenses.borrow_and_update().clone();
                if let Some(error) = &state.error {
                    warn!(error = %error, "Expense view failed");
                    continue;
                }
                if state.loading {
                    continue;
                }

                let today = Local::now().date_naive();
                let summary = summarize(&state.records, today);
                info!(
                    query_state = ?state.query_state,
                    expenses = state.records.len(),
                    total = %summary.total,
                    this_month = %summary.this_month,
                    change_percent = %summary.monthly_change_percent.round_dp(1),
                    awaiting_approval = summary.awaiting_approval,
                    "Dashboard updated"
                );

                let categories = session.categories().current();
                for alert in budget_alerts(&state.records, &categories.records, today) {
                    warn!(
                        category = %alert.category,
                        spent = %alert.spent,
                        budget = %alert.budget,
                        percent_used = %alert.percent_used.round_dp(0),
                        severity = ?alert.severity,
                        "Budget alert"
                    );
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    session.settle().await;
    session.end();
    auth.sign_out().await?;
    info!("expense-sync stopped");

    Ok(())
}
