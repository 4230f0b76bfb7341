use std::sync::Arc;
use std::time::Duration;

use crate::auth::session::SessionState;
use crate::config::Config;
use crate::ledger::LeaveLedger;
use crate::store::LeaveStore;
use crate::utils::email_filter::EmailFilter;

/// Everything handlers share. Registered once as `web::Data<AppState>`.
pub struct AppState {
    pub ledger: LeaveLedger,
    pub sessions: SessionState,
    pub emails: EmailFilter,
}

impl AppState {
    pub fn new(store: Arc<dyn LeaveStore>, config: &Config) -> Self {
        Self {
            ledger: LeaveLedger::new(store.clone()),
            sessions: SessionState::new(
                store,
                config.profile_cache_capacity,
                Duration::from_secs(config.access_token_ttl as u64),
            ),
            emails: EmailFilter::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn LeaveStore> {
        self.ledger.store()
    }
}
