//! Live, ordered views over the store.
//!
//! A subscription yields a full snapshot first and then a fresh snapshot
//! after every committed change to the watched collection. Dropping the
//! stream unsubscribes; subscribing again starts from a new snapshot.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::model::{employee::Employee, leave_request::LeaveRequest};
use crate::store::{ChangeEvent, Collection, LeaveStore, RequestQuery, StoreError};

/// Requests matching `query`, newest submission first.
pub fn subscribe_requests(
    store: Arc<dyn LeaveStore>,
    query: RequestQuery,
) -> impl Stream<Item = Result<Vec<LeaveRequest>, StoreError>> {
    snapshots(store, Collection::Requests, move |store| {
        let query = query.clone();
        async move { store.list_requests(&query).await }
    })
}

/// Every employee profile.
pub fn subscribe_employees(
    store: Arc<dyn LeaveStore>,
) -> impl Stream<Item = Result<Vec<Employee>, StoreError>> {
    snapshots(store, Collection::Users, |store| async move {
        store.list_employees().await
    })
}

struct Subscription<T, F> {
    store: Arc<dyn LeaveStore>,
    collection: Collection,
    fetch: F,
    changes: broadcast::Receiver<ChangeEvent>,
    last: Option<Vec<T>>,
    primed: bool,
}

fn snapshots<T, F, Fut>(
    store: Arc<dyn LeaveStore>,
    collection: Collection,
    fetch: F,
) -> impl Stream<Item = Result<Vec<T>, StoreError>>
where
    T: PartialEq + Clone,
    F: Fn(Arc<dyn LeaveStore>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    // Subscribe before the first read so no commit falls between the two.
    let changes = store.changes();
    let state = Subscription {
        store,
        collection,
        fetch,
        changes,
        last: None,
        primed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.primed && !wait_for_change(&mut state.changes, state.collection).await {
                return None;
            }
            state.primed = true;

            match (state.fetch)(state.store.clone()).await {
                Ok(snapshot) => {
                    if state.last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    state.last = Some(snapshot.clone());
                    return Some((Ok(snapshot), state));
                }
                Err(err) => return Some((Err(err), state)),
            }
        }
    })
}

/// Waits for a change to `collection`. `false` once the store is gone.
async fn wait_for_change(changes: &mut broadcast::Receiver<ChangeEvent>, collection: Collection) -> bool {
    loop {
        match changes.recv().await {
            Ok(event) if event.collection == collection => return true,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, ?collection, "Subscriber lagged; resyncing from snapshot");
                return true;
            }
            Err(RecvError::Closed) => return false,
        }
    }
}
