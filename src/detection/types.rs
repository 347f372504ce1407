// SPDX-License-Identifier: GPL-3.0-only

//! Types for detector output

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Axis-aligned box in pixel coordinates of the rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Create a box, ordering the corners so `x1 <= x2` and `y1 <= y2`
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// A single labelled detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Always within `[0, 1]`
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a detection; confidence is clamped into `[0, 1]` (NaN becomes 0)
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// The distinct labels seen in one cycle
///
/// Equality ignores the order labels were detected in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label-set of a cycle's detections (boxes and confidences are ignored)
    pub fn from_detections(detections: &[Detection]) -> Self {
        detections.iter().map(|d| d.label.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// Labels in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Spoken form: labels joined by ", ", each replaced by its translation when one exists
    pub fn to_phrase(&self, translations: &HashMap<String, String>) -> String {
        self.iter()
            .map(|label| translations.get(label).map(String::as_str).unwrap_or(label))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for LabelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.iter().collect::<Vec<_>>().join(", "))
    }
}
