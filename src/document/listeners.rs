use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::event::DocumentEvent;

const BACKLOG_LIMIT: usize = 64;

#[derive(Debug, Default)]
struct ListenerSet {
    senders: Vec<flume::Sender<DocumentEvent>>,
    backlog: VecDeque<DocumentEvent>,
}

/// Registered receivers of a document's lifecycle events.
///
/// Events raised while nobody listens are kept (up to a small bound) and
/// handed to the next subscriber, so a listener registered right after
/// `open` still observes `Loaded`.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    inner: Mutex<ListenerSet>,
}

impl Listeners {
    pub(crate) fn subscribe(&self) -> flume::Receiver<DocumentEvent> {
        let (tx, rx) = flume::unbounded();
        let mut set = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for event in set.backlog.drain(..) {
            let _ = tx.send(event);
        }
        set.senders.push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: DocumentEvent) {
        let mut set = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        set.senders.retain(|tx| tx.send(event.clone()).is_ok());
        if set.senders.is_empty() {
            if set.backlog.len() == BACKLOG_LIMIT {
                set.backlog.pop_front();
            }
            set.backlog.push_back(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Listeners;
    use crate::event::DocumentEvent;

    #[test]
    fn first_subscriber_receives_backlog() {
        let listeners = Listeners::default();
        listeners.emit(DocumentEvent::Loaded);
        listeners.emit(DocumentEvent::SlideChanged { slide: 0 });

        let rx = listeners.subscribe();
        assert!(matches!(rx.try_recv(), Ok(DocumentEvent::Loaded)));
        assert!(matches!(
            rx.try_recv(),
            Ok(DocumentEvent::SlideChanged { slide: 0 })
        ));

        let late = listeners.subscribe();
        listeners.emit(DocumentEvent::Closed);
        assert!(matches!(rx.try_recv(), Ok(DocumentEvent::Closed)));
        assert!(matches!(late.try_recv(), Ok(DocumentEvent::Closed)));
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let listeners = Listeners::default();
        let rx = listeners.subscribe();
        drop(rx);
        listeners.emit(DocumentEvent::Closed);

        let next = listeners.subscribe();
        assert!(matches!(next.try_recv(), Ok(DocumentEvent::Closed)));
    }
}
