//! Deadline race for a single webhook attempt.

use std::future::Future;
use std::time::Duration;

use futures::future::{self, Either};

/// The deadline fired before the raced future settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// Length of the deadline that fired.
    pub after: Duration,
}

/// Race `fut` against a fresh timer of length `after`.
///
/// Whichever settles first decides the result. The loser is dropped before
/// this returns: a timed-out request is abandoned and its eventual response
/// is never observed.
pub async fn with_deadline<F>(after: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    let fut = Box::pin(fut);
    let timer = Box::pin(tokio::time::sleep(after));

    match future::select(fut, timer).await {
        Either::Left((output, timer)) => {
            drop(timer);
            Ok(output)
        }
        Either::Right(((), fut)) => {
            drop(fut);
            tracing::debug!(
                name: "webhook.deadline.elapsed",
                after_ms = after.as_millis() as u64,
                "Deadline elapsed, abandoning attempt"
            );
            Err(Elapsed { after })
        }
    }
}
