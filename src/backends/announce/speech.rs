// SPDX-License-Identifier: GPL-3.0-only

//! Text-to-speech through an external command

use super::{Announcement, Announcer};
use crate::errors::AnnounceError;
use std::process::{Command, Stdio};
use tracing::debug;

/// Placeholder replaced by the announcement's language tag
pub const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Placeholder replaced by the phrase to speak
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Speaks announcements by running a TTS program and waiting for it
///
/// Arguments may contain `{lang}` and `{text}`. With `espeak-ng` the
/// default arguments are `-v {lang} {text}`.
#[derive(Debug, Clone)]
pub struct SpeechAnnouncer {
    program: String,
    args: Vec<String>,
}

impl SpeechAnnouncer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments for one announcement, placeholders filled in
    pub fn command_args(&self, announcement: &Announcement) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(LANGUAGE_PLACEHOLDER, &announcement.language)
                    .replace(TEXT_PLACEHOLDER, &announcement.phrase)
            })
            .collect();

        // Always say something, even with a template that forgot the text
        if !self.args.iter().any(|arg| arg.contains(TEXT_PLACEHOLDER)) {
            args.push(announcement.phrase.clone());
        }
        args
    }
}

impl Announcer for SpeechAnnouncer {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError> {
        let args = self.command_args(announcement);
        debug!(program = %self.program, ?args, "Running speech command");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AnnounceError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AnnounceError::CommandFailed {
                program: self.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::LabelSet;
    use std::collections::HashMap;

    fn announcement(labels: &[&str], language: &str) -> Announcement {
        let labels: LabelSet = labels.iter().copied().collect();
        Announcement::new(labels, &HashMap::new(), language)
    }

    #[test]
    fn test_placeholders_are_filled() {
        let speaker = SpeechAnnouncer::new(
            "espeak-ng",
            vec!["-v".into(), "{lang}".into(), "{text}".into()],
        );
        let args = speaker.command_args(&announcement(&["dog", "cat"], "es"));
        assert_eq!(args, vec!["-v", "es", "cat, dog"]);
    }

    #[test]
    fn test_text_appended_without_placeholder() {
        let speaker = SpeechAnnouncer::new("spd-say", vec!["-l".into(), "{lang}".into()]);
        let args = speaker.command_args(&announcement(&["cup"], "en"));
        assert_eq!(args, vec!["-l", "en", "cup"]);
    }

    #[test]
    fn test_missing_program_reports_spawn_failure() {
        let mut speaker = SpeechAnnouncer::new("/nonexistent/tts", Vec::new());
        let err = speaker.announce(&announcement(&["cup"], "en")).unwrap_err();
        assert!(matches!(err, AnnounceError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status() {
        let mut speaker = SpeechAnnouncer::new("false", Vec::new());
        let err = speaker.announce(&announcement(&["cup"], "en")).unwrap_err();
        assert!(matches!(err, AnnounceError::CommandFailed { .. }));
    }
}
