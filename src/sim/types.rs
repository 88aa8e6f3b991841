use serde::Serialize;
use std::fmt;

/// A single labeled bounding box reported by `detect_objects`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: &str, x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            label: label.to_string(),
            x,
            y,
            width,
            height,
            confidence,
        }
    }
}

/// Ordered detections plus an opaque metadata field reserved for later use.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Observation {
    pub detections: Vec<Detection>,
    pub metadata: String,
}

impl Observation {
    pub fn single(detection: Detection) -> Self {
        Self {
            detections: vec![detection],
            metadata: String::new(),
        }
    }

    #[cfg(test)]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.detections.iter().map(|d| d.label.as_str())
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, d) in self.detections.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "({}, {}, {}, {}, {}, {})",
                d.label, d.x, d.y, d.width, d.height, d.confidence
            )?;
        }
        write!(f, "]")
    }
}

/// Position plus quaternion-like orientation. Always zero in the mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.position;
        let [qx, qy, qz, qw] = self.orientation;
        write!(f, "(({x}, {y}, {z}), ({qx}, {qy}, {qz}, {qw}))")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStatus {
    Free,
    Front,
    Left,
    Right,
}

impl CollisionStatus {
    pub const BLOCKED: [CollisionStatus; 3] = [Self::Front, Self::Left, Self::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for CollisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
