use crate::backup::summary::BackupResult;
use std::path::PathBuf;

/// Something worth telling an observer about while a run executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupEvent {
    /// A destination name was taken and `chosen` replaced `candidate`.
    Renamed {
        origin: PathBuf,
        candidate: String,
        chosen: String,
    },
    Completed(BackupResult),
    Failed(String),
}

/// Optional receiver of [`BackupEvent`]s. Runs behave identically with or without one.
pub trait Notification {
    fn notify(&self, event: &BackupEvent);
}

impl<F: Fn(&BackupEvent)> Notification for F {
    fn notify(&self, event: &BackupEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_closure_is_notification() {
        let (tx, rx) = mpsc::channel();
        let sink = move |event: &BackupEvent| {
            let _ = tx.send(event.clone());
        };

        sink.notify(&BackupEvent::Failed("disk full".into()));

        assert_eq!(rx.recv().unwrap(), BackupEvent::Failed("disk full".into()));
    }
}
