use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;

use crate::store::LeaveStore;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of registered emails. A miss means the email is free;
/// a hit still has to be confirmed against the store.
pub struct EmailFilter {
    filter: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl EmailFilter {
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize(email);
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email)
    }

    pub fn insert(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
    }

    /// Seeds the filter with every registered profile email.
    pub async fn warmup(&self, store: &dyn LeaveStore, batch_size: usize) -> Result<usize> {
        let emails: Vec<String> = store
            .list_employees()
            .await?
            .into_iter()
            .map(|e| normalize(&e.email))
            .collect();

        for batch in emails.chunks(batch_size.max(1)) {
            let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
            for email in batch {
                filter.add(email);
            }
        }

        log::info!("Email filter warmup complete: {} users", emails.len());
        Ok(emails.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::{Employee, UserType};
    use crate::store::MemoryLeaveStore;

    #[test]
    fn lookups_ignore_case_and_padding() {
        let filter = EmailFilter::default();
        assert!(!filter.might_exist("jane@company.com"));
        filter.insert(" Jane@Company.com ");
        assert!(filter.might_exist("jane@company.com"));
    }

    #[tokio::test]
    async fn warmup_loads_store_emails() {
        let store = MemoryLeaveStore::new();
        store
            .put_employee(Employee::new("u1".into(), "Jane".into(), "jane@company.com".into(), UserType::Employee))
            .await;

        let filter = EmailFilter::default();
        assert_eq!(filter.warmup(&store, 10).await.unwrap(), 1);
        assert!(filter.might_exist("JANE@company.com"));
    }
}
