use log::{error, trace};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::api::ApiError;
use crate::api::models::{Calendar, ContactFolder, FolderRef, MailFolder};
use crate::auth::Grant;
use crate::error::ViewerError;
use crate::viewer::props::PropertyRow;
use crate::viewer::tree::NodeId;

/// Result of a background fetch, applied on the UI thread.
#[derive(Debug)]
pub enum Completion {
    RootFolder {
        generation: u64,
        result: Result<FolderRef, ApiError>,
    },
    Calendars {
        parent: NodeId,
        result: Result<Vec<Calendar>, ApiError>,
    },
    ChildMailFolders {
        parent: NodeId,
        result: Result<Vec<MailFolder>, ApiError>,
    },
    ChildContactFolders {
        parent: NodeId,
        result: Result<Vec<ContactFolder>, ApiError>,
    },
    Properties {
        ticket: u64,
        /// Token acquired for the fetch; `None` when acquiring it failed.
        grant: Option<Grant>,
        result: Result<Option<Vec<PropertyRow>>, ViewerError>,
    },
    EditorResponse {
        result: Result<String, ApiError>,
    },
}

/// Runs jobs on worker threads and queues their completions for the UI thread.
pub struct Dispatcher {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Start `job` on its own thread. Returns `false` if the thread could not be started,
    /// in which case no completion will arrive for it.
    pub fn spawn<F>(&mut self, name: &str, job: F) -> bool
    where
        F: FnOnce() -> Completion + Send + 'static,
    {
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // The receiver only disappears when the viewer is dropped.
                let _ = tx.send(job());
            });
        match spawned {
            Ok(_) => {
                self.in_flight += 1;
                trace!("dispatched {name} ({} in flight)", self.in_flight);
                true
            }
            Err(e) => {
                error!("could not start worker for {name}: {e}");
                false
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn try_next(&mut self) -> Option<Completion> {
        let c = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(c)
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(c) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(c)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_job_reports_and_completes() {
        let mut d = Dispatcher::new();
        assert!(d.spawn("editor-request", || Completion::EditorResponse {
            result: Ok("{}".into()),
        }));
        assert_eq!(d.in_flight(), 1);

        match d.next_timeout(Duration::from_secs(5)) {
            Some(Completion::EditorResponse { result }) => assert_eq!(result.unwrap(), "{}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(d.in_flight(), 0);
        assert!(d.try_next().is_none());
    }
}
