//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance from a to b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float,
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    } else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the canonical heading range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float,
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let r = rem_euclid(value + pi_t, tau_t) - pi_t;

    // rem_euclid gives [-pi, pi), the canonical range includes +pi instead of -pi
    if r <= -pi_t {
        pi_t
    } else {
        r
    }
}

/// Apply a deadband to a value in the range `[-max, max]`.
///
/// Values within `deadband` of zero become zero, the remainder of the range is rescaled so that
/// the output still spans `[-max, max]` without a step at the deadband edge.
pub fn apply_deadband<T>(value: T, deadband: T, max: T) -> T
where
    T: Float,
{
    if value.abs() <= deadband {
        T::zero()
    } else if value > T::zero() {
        lin_map((deadband, max), (T::zero(), max), value)
    } else {
        lin_map((-max, -deadband), (-max, T::zero()), value)
    }
}

/// Square a value while keeping its sign.
pub fn signed_square<T>(value: T) -> T
where
    T: Float,
{
    value * value.abs()
}

#[cfg(test)]
mod test {
    use super::*;

    const TAU: f64 = std::f64::consts::TAU;
    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_get_ang_dist_2pi() {
        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.5f64) - 0.5).abs() < 1e-12);
        assert!((wrap_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-5.0 * TAU + 0.25) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_apply_deadband() {
        assert_eq!(apply_deadband(0.05f64, 0.1, 1.0), 0.0);
        assert_eq!(apply_deadband(-0.1f64, 0.1, 1.0), 0.0);
        assert!((apply_deadband(1.0f64, 0.1, 1.0) - 1.0).abs() < 1e-12);
        assert!((apply_deadband(-1.0f64, 0.1, 1.0) + 1.0).abs() < 1e-12);
        assert!((apply_deadband(0.55f64, 0.1, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_signed_square() {
        assert_eq!(signed_square(0.5f64), 0.25);
        assert_eq!(signed_square(-0.5f64), -0.25);
        assert_eq!(signed_square(1.0f64), 1.0);
        assert_eq!(signed_square(-1.0f64), -1.0);
    }
}
