// SPDX-License-Identifier: GPL-3.0-only

//! Spoken announcements
//!
//! The detection worker hands every non-suppressed label-set to an
//! [`Announcer`]. Announcers may be slow (speech takes seconds), so the
//! driver usually wraps them in a [`BackgroundAnnouncer`] to keep the
//! worker's pacing independent of the speaker.

mod background;
mod speech;

pub use background::BackgroundAnnouncer;
pub use speech::SpeechAnnouncer;

use crate::detection::LabelSet;
use crate::errors::AnnounceError;
use std::collections::HashMap;
use tracing::info;

/// What to say, and in which language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub labels: LabelSet,
    /// Labels after translation, joined by ", "
    pub phrase: String,
    /// Language tag passed to the speech engine (`en`, `es`, ...)
    pub language: String,
}

impl Announcement {
    pub fn new(
        labels: LabelSet,
        translations: &HashMap<String, String>,
        language: impl Into<String>,
    ) -> Self {
        let phrase = labels.to_phrase(translations);
        Self {
            labels,
            phrase,
            language: language.into(),
        }
    }
}

/// Sink for announcements
///
/// Errors are reported to the caller, which logs them; an announcer
/// failure never stops the pipeline.
pub trait Announcer: Send {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError>;
}

impl<A: Announcer + ?Sized> Announcer for Box<A> {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError> {
        (**self).announce(announcement)
    }
}

/// Announcer that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError> {
        info!(
            language = %announcement.language,
            labels = %announcement.labels,
            "Announcing: {}",
            announcement.phrase
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_phrase_is_translated() {
        let labels: LabelSet = ["person", "bicycle"].into_iter().collect();
        let mut translations = HashMap::new();
        translations.insert("bicycle".to_string(), "bicicleta".to_string());
        translations.insert("person".to_string(), "persona".to_string());

        let announcement = Announcement::new(labels.clone(), &translations, "es");
        assert_eq!(announcement.phrase, "bicicleta, persona");
        assert_eq!(announcement.labels, labels);
        assert_eq!(announcement.language, "es");
    }

    #[test]
    fn test_log_announcer_never_fails() {
        let labels: LabelSet = ["cup"].into_iter().collect();
        let announcement = Announcement::new(labels, &HashMap::new(), "en");
        assert!(LogAnnouncer.announce(&announcement).is_ok());
    }
}
