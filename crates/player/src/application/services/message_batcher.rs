//! Message batcher: collects updates that arrive in the same scheduling tick
//! and applies them as one ordered batch.
//!
//! The batcher only tracks the queue and whether a flush is scheduled; the
//! session loop decides when the tick is over and calls [`MessageBatcher::flush`].

use std::collections::VecDeque;

use rpggame_shared::ServerUpdate;

use crate::ports::outbound::ApplyError;

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub swallowed: usize,
    pub failed: usize,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.applied + self.swallowed + self.failed
    }
}

#[derive(Debug, Default)]
pub struct MessageBatcher {
    queue: VecDeque<ServerUpdate>,
    flush_scheduled: bool,
}

impl MessageBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update. Returns `true` when this call scheduled the flush.
    pub fn enqueue(&mut self, update: ServerUpdate) -> bool {
        self.queue.push_back(update);
        if self.flush_scheduled {
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain the queue in arrival order, applying each update in isolation.
    pub fn flush<F>(&mut self, mut apply: F) -> FlushReport
    where
        F: FnMut(ServerUpdate) -> Result<(), ApplyError>,
    {
        let mut report = FlushReport::default();

        while let Some(update) = self.queue.pop_front() {
            match apply(update) {
                Ok(()) => report.applied += 1,
                Err(e) if e.is_transient() => {
                    tracing::trace!(error = %e, "Ignoring transient view race");
                    report.swallowed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to apply update");
                    report.failed += 1;
                }
            }
        }

        self.flush_scheduled = false;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpggame_shared::{GameMessage, MessageCategory};

    fn narrative(text: &str) -> ServerUpdate {
        ServerUpdate {
            messages: Some(vec![GameMessage::new(text, MessageCategory::Narrative)]),
            ..Default::default()
        }
    }

    fn text_of(update: &ServerUpdate) -> String {
        update.messages()[0].text.clone()
    }

    #[test]
    fn test_only_first_enqueue_schedules_flush() {
        let mut batcher = MessageBatcher::new();

        assert!(batcher.enqueue(narrative("a")));
        assert!(!batcher.enqueue(narrative("b")));
        assert!(batcher.is_flush_scheduled());
        assert_eq!(batcher.len(), 2);

        batcher.flush(|_| Ok(()));

        assert!(!batcher.is_flush_scheduled());
        assert!(batcher.is_empty());
        assert!(batcher.enqueue(narrative("c")));
    }

    #[test]
    fn test_flush_preserves_arrival_order() {
        let mut batcher = MessageBatcher::new();
        for text in ["combat result", "loot", "level up"] {
            batcher.enqueue(narrative(text));
        }

        let mut seen = Vec::new();
        let report = batcher.flush(|update| {
            seen.push(text_of(&update));
            Ok(())
        });

        assert_eq!(seen, vec!["combat result", "loot", "level up"]);
        assert_eq!(report.applied, 3);
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut batcher = MessageBatcher::new();
        for text in ["ok", "race", "boom", "ok again"] {
            batcher.enqueue(narrative(text));
        }

        let mut seen = Vec::new();
        let report = batcher.flush(|update| {
            let text = text_of(&update);
            seen.push(text.clone());
            match text.as_str() {
                "race" => Err(ApplyError::ViewNotReady("list not built".into())),
                "boom" => Err(ApplyError::Failed("bad layout".into())),
                _ => Ok(()),
            }
        });

        assert_eq!(seen.len(), 4);
        assert_eq!(
            report,
            FlushReport {
                applied: 2,
                swallowed: 1,
                failed: 1
            }
        );
        assert_eq!(report.total(), 4);
    }
}
