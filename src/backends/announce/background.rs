// SPDX-License-Identifier: GPL-3.0-only

//! Announcer running on its own thread

use super::{Announcement, Announcer};
use crate::constants::announce::BACKGROUND_QUEUE_CAPACITY;
use crate::errors::AnnounceError;
use crossbeam_channel::{Sender, TrySendError, bounded};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Runs a wrapped announcer on a dedicated thread
///
/// `announce` only queues and returns immediately. While the speaker is
/// busy a small number of announcements wait; beyond that new ones are
/// dropped, since an outdated announcement is worse than none.
pub struct BackgroundAnnouncer {
    sender: Option<Sender<Announcement>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl BackgroundAnnouncer {
    pub fn spawn<A>(inner: A) -> std::io::Result<Self>
    where
        A: Announcer + 'static,
    {
        Self::with_capacity(inner, BACKGROUND_QUEUE_CAPACITY)
    }

    pub fn with_capacity<A>(mut inner: A, capacity: usize) -> std::io::Result<Self>
    where
        A: Announcer + 'static,
    {
        let (sender, receiver) = bounded::<Announcement>(capacity.max(1));

        let thread_handle = thread::Builder::new()
            .name("announcer".into())
            .spawn(move || {
                debug!("Announcer thread started");
                for announcement in receiver.iter() {
                    if let Err(e) = inner.announce(&announcement) {
                        warn!(error = %e, phrase = %announcement.phrase, "Announcement failed");
                    }
                }
                debug!("Announcer thread exiting");
            })?;

        Ok(Self {
            sender: Some(sender),
            thread_handle: Some(thread_handle),
        })
    }
}

impl Announcer for BackgroundAnnouncer {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError> {
        let Some(sender) = self.sender.as_ref() else {
            return Ok(());
        };

        match sender.try_send(announcement.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(phrase = %dropped.phrase, "Speaker busy, announcement dropped");
            }
            Err(TrySendError::Disconnected(dropped)) => {
                warn!(phrase = %dropped.phrase, "Announcer thread gone, announcement dropped");
            }
        }
        Ok(())
    }
}

impl Drop for BackgroundAnnouncer {
    fn drop(&mut self) {
        // Closing the channel lets the thread finish what is queued and exit
        self.sender.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Announcer thread panicked");
            } else {
                info!("Announcer thread finished");
            }
        }
    }
}
