use serde::Serialize;
use tokio::sync::broadcast;

/// What kind of write touched a user's notification-relevant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    LikeReceived,
    MatchCreated,
    SeenMarked,
    MessageReceived,
}

/// One count-affecting write, addressed to the user whose badge it moves.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileChange {
    pub user_id: String,
    pub kind: ChangeKind,
}

/// In-process fan-out of profile changes to live notification streams.
///
/// Backed by a `tokio::sync::broadcast` channel: publishing never blocks and
/// applies no backpressure. A subscriber that lags recomputes its counts from
/// storage instead of replaying what it missed.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ProfileChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileChange> {
        self.tx.subscribe()
    }

    /// Send errors only mean there are no live subscribers, which is fine.
    pub fn notify(&self, user_id: impl Into<String>, kind: ChangeKind) {
        let change = ProfileChange {
            user_id: user_id.into(),
            kind,
        };
        tracing::trace!(user_id = %change.user_id, kind = ?change.kind, "profile change");
        let _ = self.tx.send(change);
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber() {
        let bus = ChangeBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.notify("u1", ChangeKind::LikeReceived);

        let c1 = rx1.recv().await.unwrap();
        let c2 = rx2.recv().await.unwrap();
        assert_eq!(c1.user_id, "u1");
        assert_eq!(c2.kind, ChangeKind::LikeReceived);
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_fine() {
        let bus = ChangeBus::new(8);
        bus.notify("u1", ChangeKind::MatchCreated);
    }
}
