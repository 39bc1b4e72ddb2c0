//! Reconstruction of the robot's field pose from a single tag detection

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::vision::{RVEC_LEN, TVEC_LEN};

use super::CameraExtrinsics;
use crate::{field_layout::TagPose, loc::Pose2D};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A robot pose reconstructed from one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPoseSolution {
    /// The robot centre's pose on the field
    pub pose: Pose2D,

    /// Straight line distance from the camera to the tag.
    ///
    /// Units: meters
    pub tag_distance_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Reconstruct the robot's field pose from a detection of a known tag.
///
/// `tvec` is the tag's position in the camera frame (x right, y down, z forward) and `rmat` the
/// row-major rotation matrix of the tag in the camera frame.
///
/// This is a planar back-projection: the camera is placed on the field by walking the horizontal
/// camera-to-tag distance out from the tag along the tag's yaw, corrected by the bearing of the
/// tag in the image. It assumes the camera and tag are close to coplanar, camera pitch and roll
/// are not compensated.
///
/// The camera's mounting offset is removed using the gyro heading rather than the reconstructed
/// heading, so that simultaneous detections from several cameras agree on the robot position.
///
/// Returns `None` if the reconstruction is not finite, for example if the tag is reported on the
/// camera plane.
pub fn calc_field_pose(
    tag: &TagPose,
    tvec: &[f64; TVEC_LEN],
    rmat: &[f64; RVEC_LEN],
    cam: &CameraExtrinsics,
    gyro_heading_rad: f64,
) -> Option<FieldPoseSolution> {
    let tag_yaw_rad = tag.yaw_rad();

    // Horizontal distance and bearing of the tag from the camera
    let hyp_m = tvec[0].hypot(tvec[2]);
    let hyp_angle_rad = tag_yaw_rad - (tvec[0] / tvec[2]).atan();

    let cam_x_m = tag.position_m.x + hyp_m * hyp_angle_rad.cos();
    let cam_y_m = tag.position_m.y + hyp_m * hyp_angle_rad.sin();

    // Yaw of the tag relative to the camera, from the third row of the rotation matrix
    let rel_yaw_rad = (-rmat[6]).atan2((rmat[7].powi(2) + rmat[8].powi(2)).sqrt());
    let heading_rad = std::f64::consts::PI + cam.yaw_rad + tag_yaw_rad + rel_yaw_rad;

    let (s, c) = gyro_heading_rad.sin_cos();
    let [off_x, off_y] = cam.offset_m_rb;

    let pose = Pose2D::new(
        cam_x_m - off_x * c + off_y * s,
        cam_y_m - off_y * c - off_x * s,
        heading_rad,
    );

    let tag_distance_m = (tvec[0].powi(2) + tvec[1].powi(2) + tvec[2].powi(2)).sqrt();

    if pose.is_finite() && tag_distance_m.is_finite() {
        Some(FieldPoseSolution {
            pose,
            tag_distance_m,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field_layout::{test::TEST_LAYOUT, FieldLayout};
    use std::f64::consts::FRAC_PI_2;

    const IDENTITY: [f64; RVEC_LEN] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    fn cam(offset_m_rb: [f64; 2]) -> CameraExtrinsics {
        CameraExtrinsics {
            name: String::from("front"),
            offset_m_rb,
            yaw_rad: 0.0,
        }
    }

    #[test]
    fn test_head_on() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();
        let tag = layout.get(4).unwrap();

        // Tag on the red wall facing -x, camera 2 m straight in front of it
        let sol = calc_field_pose(tag, &[0.0, 0.0, 2.0], &IDENTITY, &cam([0.0, 0.0]), 0.0)
            .unwrap();

        assert!((sol.pose.x_m - 14.0).abs() < 1e-9);
        assert!((sol.pose.y_m - 5.5).abs() < 1e-9);
        assert!(sol.pose.heading_rad.abs() < 1e-9);
        assert!((sol.tag_distance_m - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_off_axis() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();
        let tag = layout.get(4).unwrap();

        // Tag appears 0.5 m to the right of the optical axis, so the camera is 0.5 m to the tag's
        // left when looking from the tag out to the field
        let sol = calc_field_pose(tag, &[0.5, 0.0, 2.0], &IDENTITY, &cam([0.0, 0.0]), 0.0)
            .unwrap();

        assert!((sol.pose.x_m - 14.0).abs() < 1e-9);
        assert!((sol.pose.y_m - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_camera_offset_uses_gyro() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();
        let tag = layout.get(4).unwrap();

        // Camera 0.3 m ahead of the robot centre
        let sol = calc_field_pose(tag, &[0.0, 0.0, 2.0], &IDENTITY, &cam([0.3, 0.0]), 0.0)
            .unwrap();
        assert!((sol.pose.x_m - 13.7).abs() < 1e-9);
        assert!((sol.pose.y_m - 5.5).abs() < 1e-9);

        // Same detection, but the gyro says the robot faces +y, so ahead is +y
        let sol = calc_field_pose(
            tag,
            &[0.0, 0.0, 2.0],
            &IDENTITY,
            &cam([0.3, 0.0]),
            FRAC_PI_2,
        )
        .unwrap();
        assert!((sol.pose.x_m - 14.0).abs() < 1e-9);
        assert!((sol.pose.y_m - 5.2).abs() < 1e-9);

        // Heading still comes from the detection, not the gyro
        assert!(sol.pose.heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_degenerate() {
        let layout = FieldLayout::from_json(TEST_LAYOUT).unwrap();
        let tag = layout.get(4).unwrap();

        assert!(
            calc_field_pose(tag, &[0.0, 0.0, 0.0], &IDENTITY, &cam([0.0, 0.0]), 0.0).is_none()
        );
        assert!(calc_field_pose(
            tag,
            &[f64::NAN, 0.0, 1.0],
            &IDENTITY,
            &cam([0.0, 0.0]),
            0.0
        )
        .is_none());
    }
}
