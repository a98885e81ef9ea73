use tokio::sync::oneshot;
use tracing::debug;

/// One-shot completion pair bridging an external event (button press,
/// target click) into a suspended battle step. Replaces manual event
/// subscribe/await/unsubscribe bookkeeping: each suspension point owns one
/// `Prompt`, and the matching `Responder` can fire at most once.
pub fn prompt<T>() -> (Responder<T>, Prompt<T>) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx: Some(tx) }, Prompt { rx })
}

/// Completion side, held by the UI/input collaborator.
pub struct Responder<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> Responder<T> {
    /// Deliver the value to the waiting prompt. Returns `false` when this
    /// responder already fired or the waiter is gone — a stale callback
    /// dispatch is a no-op, never a double completion.
    pub fn complete(&mut self, value: T) -> bool {
        match self.tx.take() {
            Some(tx) => {
                if tx.send(value).is_err() {
                    debug!("completion dropped: waiter already gone");
                    return false;
                }
                true
            }
            None => {
                debug!("stale completion ignored");
                false
            }
        }
    }

    pub fn is_spent(&self) -> bool {
        self.tx.is_none()
    }
}

/// Waiting side, awaited at the suspension point.
pub struct Prompt<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Prompt<T> {
    /// Suspend until the responder fires. `None` means the responder was
    /// dropped without completing (the external collaborator went away).
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_once() {
        let (mut responder, prompt) = prompt();
        assert!(responder.complete(7));
        assert!(responder.is_spent());
        assert!(!responder.complete(8));
        assert_eq!(prompt.wait().await, Some(7));
    }

    #[tokio::test]
    async fn stale_completion_after_waiter_dropped_is_noop() {
        let (mut responder, prompt) = prompt();
        drop(prompt);
        assert!(!responder.complete(7));
    }

    #[tokio::test]
    async fn dropped_responder_resolves_to_none() {
        let (responder, prompt) = prompt::<u32>();
        drop(responder);
        assert_eq!(prompt.wait().await, None);
    }
}
