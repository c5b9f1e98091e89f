use std::future::Future;

use tokio::task::JoinSet;

use super::schema::Collection;
use crate::error::{Error, ProvisionFailure, Result};

/// Outcome of provisioning one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Existing,
}

/// Provisions every collection in its own task and waits for all of them.
/// Every failure is reported, not just the first.
///
/// The tasks overlap only as far as `ensure` allows. `SqliteStore` runs them
/// one at a time on its single connection.
pub async fn provision_all<F, Fut>(collections: &[Collection], ensure: F) -> Result<()>
where
    F: Fn(Collection) -> Fut,
    Fut: Future<Output = Result<Provisioned>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for &collection in collections {
        let fut = ensure(collection);
        tasks.spawn(async move { (collection, fut.await) });
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((collection, Ok(outcome))) => {
                tracing::debug!(%collection, ?outcome, "collection ready");
            }
            Ok((collection, Err(error))) => {
                tracing::error!(%collection, "failed to provision collection: {error}");
                failures.push(ProvisionFailure {
                    collection: collection.to_string(),
                    error,
                });
            }
            Err(join_error) => {
                tracing::error!("provisioning task did not complete: {join_error}");
                failures.push(ProvisionFailure {
                    collection: "unknown".to_string(),
                    error: Error::Task(join_error),
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        failures.sort_by(|a, b| a.collection.cmp(&b.collection));
        Err(Error::Provisioning(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_succeed() {
        let result = provision_all(&Collection::ALL, |_| async { Ok(Provisioned::Created) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_every_failure_is_reported() {
        let result = provision_all(&Collection::ALL, |collection| async move {
            match collection {
                Collection::Users | Collection::Policies => {
                    Err(Error::Timeout(format!("create {collection}")))
                }
                _ => Ok(Provisioned::Existing),
            }
        })
        .await;

        let Err(Error::Provisioning(failures)) = result else {
            panic!("expected provisioning error");
        };
        let names: Vec<&str> = failures.iter().map(|f| f.collection.as_str()).collect();
        assert_eq!(names, vec!["policies", "users"]);
    }

    #[tokio::test]
    async fn test_tasks_overlap_when_ensure_allows() {
        // Only completes if every collection's task is running at once.
        let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(Collection::ALL.len()));
        let result = provision_all(&Collection::ALL, |_| {
            let barrier = std::sync::Arc::clone(&barrier);
            async move {
                barrier.wait().await;
                Ok(Provisioned::Created)
            }
        })
        .await;
        assert!(result.is_ok());
    }
}
