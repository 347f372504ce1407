// SPDX-License-Identifier: GPL-3.0-only

//! Detector backed by an external inference process
//!
//! The process is started once and kept alive between frames. For every
//! frame it receives, on stdin, one JSON header line followed by the raw
//! RGB24 pixels:
//!
//! ```text
//! {"width":640,"height":480,"len":921600}\n
//! <921600 bytes>
//! ```
//!
//! and answers with exactly one JSON line on stdout, either a list of
//! detections or an error object:
//!
//! ```text
//! [{"label":"person","confidence":0.91,"box":[12.0,40.5,210.0,470.0]}]
//! {"error":"CUDA out of memory"}
//! ```
//!
//! Which model runs (YOLOv5, YOLOv8, ...) is decided by the command line.
//! Lines that are not a reply (loading banners, progress output) are
//! skipped, up to a bound. If the process dies or keeps talking nonsense
//! the current frame fails and the next call starts a fresh process.

use super::Detector;
use super::types::{BoundingBox, Detection};
use crate::backends::camera::Frame;
use crate::errors::DetectionError;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Non-reply stdout lines tolerated while waiting for one frame's answer
const MAX_SKIPPED_LINES: usize = 32;

#[derive(Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
    len: usize,
}

#[derive(Deserialize)]
struct WireDetection {
    label: String,
    confidence: f32,
    #[serde(rename = "box")]
    bbox: [f32; 4],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Detections(Vec<WireDetection>),
    Error { error: String },
}

struct RunningProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl RunningProcess {
    fn shutdown(mut self) {
        drop(self.stdin);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Detector that delegates inference to a long-lived child process
pub struct ProcessDetector {
    program: String,
    args: Vec<String>,
    process: Option<RunningProcess>,
}

impl ProcessDetector {
    /// Configure the command; the process starts on the first frame
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            process: None,
        }
    }

    fn spawn(&self) -> Result<RunningProcess, DetectionError> {
        info!(program = %self.program, args = ?self.args, "Starting detector process");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DetectionError::Unavailable(format!("failed to start {}: {}", self.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DetectionError::Unavailable("detector stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectionError::Unavailable("detector stdout unavailable".into()))?;

        // Forward the model's own logging
        if let Some(stderr) = child.stderr.take() {
            let program = self.program.clone();
            std::thread::Builder::new()
                .name("detector-stderr".into())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        debug!(program = %program, "{}", line);
                    }
                })
                .map_err(|e| DetectionError::Unavailable(e.to_string()))?;
        }

        Ok(RunningProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn ensure_running(&mut self) -> Result<&mut RunningProcess, DetectionError> {
        if let Some(process) = self.process.as_mut()
            && let Ok(Some(status)) = process.child.try_wait()
        {
            warn!(program = %self.program, %status, "Detector process exited, restarting");
            if let Some(dead) = self.process.take() {
                dead.shutdown();
            }
        }

        if self.process.is_none() {
            self.process = Some(self.spawn()?);
        }

        self.process
            .as_mut()
            .ok_or_else(|| DetectionError::Unavailable("detector process not running".into()))
    }

    fn exchange(
        process: &mut RunningProcess,
        frame: &Frame,
    ) -> Result<Vec<Detection>, DetectionError> {
        let header = FrameHeader {
            width: frame.width,
            height: frame.height,
            len: frame.data().len(),
        };
        let mut line = serde_json::to_string(&header)
            .map_err(|e| DetectionError::Failed(e.to_string()))?;
        line.push('\n');

        let write = |stdin: &mut ChildStdin| -> std::io::Result<()> {
            stdin.write_all(line.as_bytes())?;
            stdin.write_all(frame.data())?;
            stdin.flush()
        };
        write(&mut process.stdin)
            .map_err(|e| DetectionError::Unavailable(format!("failed to send frame: {}", e)))?;

        let mut skipped = 0;
        loop {
            let mut response = String::new();
            let read = process
                .stdout
                .read_line(&mut response)
                .map_err(|e| DetectionError::Unavailable(format!("failed to read reply: {}", e)))?;
            if read == 0 {
                return Err(DetectionError::Unavailable(
                    "detector process closed its output".into(),
                ));
            }

            match parse_response(&response) {
                Err(DetectionError::MalformedOutput(reason)) if skipped < MAX_SKIPPED_LINES => {
                    skipped += 1;
                    debug!(reason = %reason, "Skipping non-reply detector output");
                }
                reply => return reply,
            }
        }
    }
}

/// Parse one reply line from the detector process
pub fn parse_response(line: &str) -> Result<Vec<Detection>, DetectionError> {
    let response: WireResponse = serde_json::from_str(line.trim())
        .map_err(|e| DetectionError::MalformedOutput(format!("{}: {}", e, line.trim())))?;

    match response {
        WireResponse::Detections(items) => Ok(items
            .into_iter()
            .map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                Detection::new(d.label, d.confidence, BoundingBox::new(x1, y1, x2, y2))
            })
            .collect()),
        WireResponse::Error { error } => Err(DetectionError::Failed(error)),
    }
}

impl Detector for ProcessDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let process = self.ensure_running()?;
        match Self::exchange(process, frame) {
            Err(e @ (DetectionError::Unavailable(_) | DetectionError::MalformedOutput(_))) => {
                // Out of step with the process; start over on the next frame
                if let Some(process) = self.process.take() {
                    process.shutdown();
                }
                Err(e)
            }
            reply => reply,
        }
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            debug!(program = %self.program, "Stopping detector process");
            process.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detections() {
        let line = r#"[{"label":"person","confidence":0.91,"box":[210.0,40.5,12.0,470.0]}]"#;
        let detections = parse_response(line).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[0].bbox, BoundingBox::new(12.0, 40.5, 210.0, 470.0));
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_response("[]\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_reply() {
        let err = parse_response(r#"{"error":"model not loaded"}"#).unwrap_err();
        assert_eq!(err, DetectionError::Failed("model not loaded".into()));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_response("Loading weights..."),
            Err(DetectionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let mut detector = ProcessDetector::new("/nonexistent/detector-binary", Vec::new());
        let frame = Frame::solid(2, 2, [0, 0, 0], 0);
        assert!(matches!(
            detector.detect(&frame),
            Err(DetectionError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_round_trip_through_shell_process() {
        // Reads the header and the pixel bytes, then answers with a fixed detection
        let script = r#"while IFS= read -r header; do
            len=$(echo "$header" | sed 's/.*"len":\([0-9]*\).*/\1/')
            head -c "$len" > /dev/null
            echo '[{"label":"cat","confidence":0.75,"box":[0,0,1,1]}]'
        done"#;
        let mut detector =
            ProcessDetector::new("sh", vec!["-c".to_string(), script.to_string()]);
        let frame = Frame::solid(2, 2, [9, 9, 9], 0);

        for _ in 0..2 {
            let detections = detector.detect(&frame).unwrap();
            assert_eq!(detections.len(), 1);
            assert_eq!(detections[0].label, "cat");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_banner_lines_do_not_shift_replies() {
        // Prints a banner once, then labels each reply with the frame's first byte
        let script = r#"echo 'Loading weights...'
        while IFS= read -r header; do
            len=$(echo "$header" | sed 's/.*"len":\([0-9]*\).*/\1/')
            byte=$(head -c "$len" | od -An -tu1 | head -n 1 | sed 's/^ *\([0-9]*\).*/\1/')
            echo 'fusing layers'
            echo "[{\"label\":\"px$byte\",\"confidence\":0.9,\"box\":[0,0,1,1]}]"
        done"#;
        let mut detector =
            ProcessDetector::new("sh", vec!["-c".to_string(), script.to_string()]);

        let labels: Vec<String> = [10u8, 20, 30]
            .into_iter()
            .map(|v| {
                let frame = Frame::solid(1, 1, [v, v, v], 0);
                let detections = detector.detect(&frame).unwrap();
                detections[0].label.clone()
            })
            .collect();
        assert_eq!(labels, vec!["px10", "px20", "px30"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_endless_chatter_fails_and_restarts() {
        let script = r#"while IFS= read -r header; do
            len=$(echo "$header" | sed 's/.*"len":\([0-9]*\).*/\1/')
            head -c "$len" > /dev/null
            i=0
            while [ $i -lt 40 ]; do echo "progress $i"; i=$((i + 1)); done
        done"#;
        let mut detector =
            ProcessDetector::new("sh", vec!["-c".to_string(), script.to_string()]);
        let frame = Frame::solid(1, 1, [0, 0, 0], 0);

        assert!(matches!(
            detector.detect(&frame),
            Err(DetectionError::MalformedOutput(_))
        ));
        assert!(detector.process.is_none());
        assert!(matches!(
            detector.detect(&frame),
            Err(DetectionError::MalformedOutput(_))
        ));
    }
}
