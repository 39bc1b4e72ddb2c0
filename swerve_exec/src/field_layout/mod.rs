//! # Field layout
//!
//! The known poses of the fiducial tags on the field, loaded once at startup from a JSON file in
//! the WPILib AprilTag layout format.
//!
//! Poses in the file are relative to the blue alliance origin. When playing as the red alliance
//! the layout is mirrored across the field's mid-line, so that `(x, y, yaw)` becomes
//! `(length - x, y, pi - yaw)`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

// Internal
use comms_if::tc::Alliance;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of a single tag on the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagPose {
    pub id: i64,

    /// Position of the tag centre in the field frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Orientation of the tag in the field frame. The tag faces along its local x axis.
    pub rotation: UnitQuaternion<f64>,
}

/// The layout of all tags on the field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    tags: HashMap<i64, TagPose>,

    /// Units: meters
    pub length_m: f64,

    /// Units: meters
    pub width_m: f64,
}

// ---- FILE FORMAT ----

#[derive(Deserialize)]
struct LayoutFile {
    tags: Vec<TagEntry>,
    field: FieldEntry,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(rename = "ID")]
    id: i64,
    pose: PoseEntry,
}

#[derive(Deserialize)]
struct PoseEntry {
    translation: TranslationEntry,
    rotation: RotationEntry,
}

#[derive(Deserialize)]
struct TranslationEntry {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct RotationEntry {
    quaternion: QuaternionEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct QuaternionEntry {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct FieldEntry {
    length: f64,
    width: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FieldLayoutError {
    #[error("Cannot load the field layout file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot parse the field layout: {0}")]
    ParseError(serde_json::Error),

    #[error("Field dimensions must be positive, found {0} x {1} m")]
    InvalidFieldSize(f64, f64),

    #[error("Tag {0} appears more than once in the layout")]
    DuplicateTag(i64),

    #[error("Tag {0} has an invalid pose")]
    InvalidTagPose(i64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TagPose {
    /// Heading of the tag's facing direction on the field.
    ///
    /// Units: radians
    pub fn yaw_rad(&self) -> f64 {
        self.rotation.euler_angles().2
    }
}

impl FieldLayout {
    /// Load a layout from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FieldLayoutError> {
        let json = read_to_string(path).map_err(FieldLayoutError::FileLoadError)?;
        Self::from_json(&json)
    }

    /// Parse a layout from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FieldLayoutError> {
        let file: LayoutFile = serde_json::from_str(json).map_err(FieldLayoutError::ParseError)?;

        if !(file.field.length > 0.0 && file.field.width > 0.0) {
            return Err(FieldLayoutError::InvalidFieldSize(
                file.field.length,
                file.field.width,
            ));
        }

        let mut tags = HashMap::with_capacity(file.tags.len());

        for entry in file.tags {
            let t = &entry.pose.translation;
            let q = &entry.pose.rotation.quaternion;

            let quat = Quaternion::new(q.w, q.x, q.y, q.z);
            if !(quat.norm() > 0.0) || !(t.x.is_finite() && t.y.is_finite() && t.z.is_finite()) {
                return Err(FieldLayoutError::InvalidTagPose(entry.id));
            }

            let tag = TagPose {
                id: entry.id,
                position_m: Vector3::new(t.x, t.y, t.z),
                rotation: UnitQuaternion::from_quaternion(quat),
            };

            if tags.insert(entry.id, tag).is_some() {
                return Err(FieldLayoutError::DuplicateTag(entry.id));
            }
        }

        debug!(
            "Field layout with {} tags on a {} x {} m field",
            tags.len(),
            file.field.length,
            file.field.width
        );

        Ok(Self {
            tags,
            length_m: file.field.length,
            width_m: file.field.width,
        })
    }

    /// Get the pose of a tag, or `None` if the tag is not on this field.
    pub fn get(&self, id: i64) -> Option<&TagPose> {
        self.tags.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Ids of every tag on the field, in ascending order.
    #[cfg(test)]
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.tags.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Return true if the point lies strictly inside the field boundary.
    pub fn contains(&self, x_m: f64, y_m: f64) -> bool {
        x_m > 0.0 && x_m < self.length_m && y_m > 0.0 && y_m < self.width_m
    }

    /// The layout seen from the red alliance origin.
    ///
    /// Positions are reflected across the mid-line `x = length / 2`. Orientations are reflected
    /// as `R' = M R N` where `M = diag(-1, 1, 1)` reflects the field and `N = diag(1, -1, 1)`
    /// restores the tag's handedness, so a tag yaw `psi` becomes `pi - psi`.
    pub fn mirrored(&self) -> Self {
        let m = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0));
        let n = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0));

        let tags = self
            .tags
            .iter()
            .map(|(id, tag)| {
                let r = m * tag.rotation.to_rotation_matrix().into_inner() * n;
                let mirrored = TagPose {
                    id: *id,
                    position_m: Vector3::new(
                        self.length_m - tag.position_m.x,
                        tag.position_m.y,
                        tag.position_m.z,
                    ),
                    rotation: UnitQuaternion::from_rotation_matrix(
                        &Rotation3::from_matrix_unchecked(r),
                    ),
                };
                (*id, mirrored)
            })
            .collect();

        Self {
            tags,
            length_m: self.length_m,
            width_m: self.width_m,
        }
    }

    /// The layout for the given alliance, mirrored for red.
    pub fn for_alliance(&self, alliance: Alliance) -> Self {
        match alliance {
            Alliance::Blue => self.clone(),
            Alliance::Red => self.mirrored(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// Two tags, one on the red wall facing the field and one on the side wall
    pub(crate) const TEST_LAYOUT: &str = r#"{
        "tags": [
            {
                "ID": 4,
                "pose": {
                    "translation": {"x": 16.0, "y": 5.5, "z": 1.45},
                    "rotation": {"quaternion": {"W": 0.0, "X": 0.0, "Y": 0.0, "Z": 1.0}}
                }
            },
            {
                "ID": 5,
                "pose": {
                    "translation": {"x": 14.7, "y": 8.2, "z": 1.36},
                    "rotation": {"quaternion": {"W": 0.7071067811865476, "X": 0.0, "Y": 0.0, "Z": -0.7071067811865476}}
                }
            }
        ],
        "field": {"length": 16.54, "width": 8.21}
    }"#;

    #[test]
    fn test_parse() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();

        assert_eq!(layout.len(), 2);
        assert_eq!(layout.ids(), vec![4, 5]);
        assert_eq!(layout.length_m, 16.54);

        let tag = layout.get(4).unwrap();
        assert_eq!(tag.position_m.x, 16.0);
        assert!((tag.yaw_rad().abs() - PI).abs() < 1e-9);

        let tag = layout.get(5).unwrap();
        assert!((tag.yaw_rad() + FRAC_PI_2).abs() < 1e-9);

        assert!(layout.get(99).is_none());
    }

    #[test]
    fn test_mirror() {
        let blue = FieldLayout::from_json(TEST_LAYOUT).unwrap();
        let red = blue.for_alliance(Alliance::Red);

        for id in blue.ids() {
            let b = blue.get(id).unwrap();
            let r = red.get(id).unwrap();

            assert!((r.position_m.x - (blue.length_m - b.position_m.x)).abs() < 1e-12);
            assert_eq!(r.position_m.y, b.position_m.y);
            assert_eq!(r.position_m.z, b.position_m.z);

            // Yaw reflected, psi -> pi - psi
            let expected = util::maths::wrap_pi(PI - b.yaw_rad());
            let diff = util::maths::get_ang_dist_2pi(expected, r.yaw_rad());
            assert!(diff.abs() < 1e-9);
        }

        // Tag on the red wall facing -x now sits near the origin facing +x
        assert!(red.get(4).unwrap().yaw_rad().abs() < 1e-9);

        // Mirroring twice is the identity
        let back = red.mirrored();
        let b = blue.get(5).unwrap();
        let bb = back.get(5).unwrap();
        assert!((b.position_m - bb.position_m).norm() < 1e-12);
        assert!(b.rotation.angle_to(&bb.rotation) < 1e-9);

        assert_eq!(blue.for_alliance(Alliance::Blue), blue);
    }

    #[test]
    fn test_contains() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();

        assert!(layout.contains(1.0, 1.0));
        assert!(!layout.contains(0.0, 1.0));
        assert!(!layout.contains(1.0, 8.21));
        assert!(!layout.contains(-0.1, 1.0));
        assert!(!layout.contains(17.0, 1.0));
    }

    #[test]
    fn test_bad_layouts() {
        assert!(matches!(
            FieldLayout::from_json("{}"),
            Err(FieldLayoutError::ParseError(_))
        ));
        assert!(matches!(
            FieldLayout::from_json(r#"{"tags": [], "field": {"length": 0.0, "width": 8.0}}"#),
            Err(FieldLayoutError::InvalidFieldSize(_, _))
        ));
        assert!(matches!(
            FieldLayout::load("/no/such/layout.json"),
            Err(FieldLayoutError::FileLoadError(_))
        ));

        let dup = TEST_LAYOUT.replace("\"ID\": 5", "\"ID\": 4");
        assert!(matches!(
            FieldLayout::from_json(&dup),
            Err(FieldLayoutError::DuplicateTag(4))
        ));
    }
}
