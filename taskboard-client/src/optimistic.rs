/// Optimistic updates
///
/// [`OptimisticCommand`] applies a local patch, runs the remote command, and
/// on failure replaces local state with whatever the reconcile step fetches.
/// If reconciling fails as well, the state from before the patch comes back.
///
/// # Example
///
/// ```
/// use taskboard_client::optimistic::{OptimisticCommand, Settled};
///
/// # async fn example() {
/// let mut columns = vec!["To Do"];
///
/// let settled = OptimisticCommand::new(
///     |state: &mut Vec<&str>| state[0] = "In Progress",
///     || async { Err::<(), _>("offline") },
/// )
/// .execute(&mut columns, || async { Ok(vec!["To Do"]) })
/// .await;
///
/// assert!(matches!(settled, Settled::Reconciled { error: "offline" }));
/// assert_eq!(columns, vec!["To Do"]);
/// # }
/// ```

use std::future::Future;

/// Outcome of an optimistic command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    /// Remote accepted; the local patch stands
    Confirmed(T),

    /// Remote rejected; local state was replaced by a fresh fetch
    Reconciled { error: E },

    /// Remote rejected and the fetch failed; the pre-patch state is back
    Restored { error: E, reconcile_error: E },
}

impl<T, E> Settled<T, E> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Settled::Confirmed(_))
    }

    /// Remote error, if the command failed
    pub fn error(&self) -> Option<&E> {
        match self {
            Settled::Confirmed(_) => None,
            Settled::Reconciled { error } | Settled::Restored { error, .. } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settled::Confirmed(value) => Ok(value),
            Settled::Reconciled { error } | Settled::Restored { error, .. } => Err(error),
        }
    }
}

/// Local patch plus the remote command that makes it permanent
pub struct OptimisticCommand<P, C> {
    patch: P,
    command: C,
}

impl<P, C> OptimisticCommand<P, C> {
    pub fn new(patch: P, command: C) -> Self {
        Self { patch, command }
    }

    /// Patches `state`, runs the command, reconciles on failure
    pub async fn execute<S, T, E, Fut, R, RFut>(self, state: &mut S, reconcile: R) -> Settled<T, E>
    where
        S: Clone,
        P: FnOnce(&mut S),
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnOnce() -> RFut,
        RFut: Future<Output = Result<S, E>>,
    {
        let snapshot = state.clone();
        (self.patch)(state);

        let error = match (self.command)().await {
            Ok(value) => return Settled::Confirmed(value),
            Err(error) => error,
        };

        match reconcile().await {
            Ok(fresh) => {
                *state = fresh;
                Settled::Reconciled { error }
            }
            Err(reconcile_error) => {
                *state = snapshot;
                Settled::Restored {
                    error,
                    reconcile_error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirmed_keeps_patch() {
        let mut state = 1;
        let settled = OptimisticCommand::new(|s: &mut i32| *s = 2, || async { Ok::<_, String>("ok") })
            .execute(&mut state, || async { Ok(99) })
            .await;

        assert_eq!(settled, Settled::Confirmed("ok"));
        assert_eq!(state, 2);
    }

    #[tokio::test]
    async fn test_failure_takes_reconciled_state() {
        let mut state = 1;
        let settled = OptimisticCommand::new(
            |s: &mut i32| *s = 2,
            || async { Err::<(), _>("rejected".to_string()) },
        )
        .execute(&mut state, || async { Ok(5) })
        .await;

        assert_eq!(settled.error().map(String::as_str), Some("rejected"));
        assert!(!settled.is_confirmed());
        assert_eq!(state, 5);
    }

    #[tokio::test]
    async fn test_double_failure_restores_snapshot() {
        let mut state = 1;
        let settled = OptimisticCommand::new(
            |s: &mut i32| *s = 2,
            || async { Err::<(), _>("rejected".to_string()) },
        )
        .execute(&mut state, || async { Err("offline".to_string()) })
        .await;

        assert_eq!(
            settled,
            Settled::Restored {
                error: "rejected".to_string(),
                reconcile_error: "offline".to_string(),
            }
        );
        assert_eq!(state, 1);
    }
}
