//! Spherical harmonics (SH) for view-dependent colors.

pub mod encoding;
pub mod evaluate;

pub use crate::error::Error;
pub use encoding::*;
pub use evaluate::*;

/// The count of spherical harmonics coefficients
pub const SH_COUNT_MAX: usize = (SH_DEGREE_MAX as usize + 1).pow(2);

/// The maximum degree of spherical harmonics
pub const SH_DEGREE_MAX: u32 = 3;

/// The real coefficients of orthonormalized spherical harmonics from degree 0 to 3
///
/// The Condon–Shortley phase is folded into the signs.
///
/// ## Examples
///
/// ```rust
/// use gausplat_preprocessor::spherical_harmonics::SH_COEF;
///
/// assert_eq!(SH_COEF.0[0], 0.28209479177387814);
/// assert_eq!(SH_COEF.3[3 + 2], 1.445305721320277);
///
/// assert_eq!(
///     SH_COEF,
///     (
///         [0.28209479177387814],
///         [
///             -0.4886025119029199,
///             0.4886025119029199,
///             -0.4886025119029199,
///         ],
///         [
///             1.0925484305920792,
///             -1.0925484305920792,
///             0.31539156525252005,
///             -1.0925484305920792,
///             0.5462742152960396,
///         ],
///         [
///             -0.5900435899266435,
///             2.890611442640554,
///             -0.4570457994644658,
///             0.3731763325901154,
///             -0.4570457994644658,
///             1.445305721320277,
///             -0.5900435899266435,
///         ],
///     )
/// );
/// ```
#[allow(clippy::type_complexity)]
pub const SH_COEF: ([f32; 1], [f32; 3], [f32; 5], [f32; 7]) = (
    [0.28209479177387814],
    [-0.4886025119029199, 0.4886025119029199, -0.4886025119029199],
    [
        1.0925484305920792,
        -1.0925484305920792,
        0.31539156525252005,
        -1.0925484305920792,
        0.5462742152960396,
    ],
    [
        -0.5900435899266435,
        2.890611442640554,
        -0.4570457994644658,
        0.3731763325901154,
        -0.4570457994644658,
        1.445305721320277,
        -0.5900435899266435,
    ],
);

/// The degree of spherical harmonics of a dataset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ShDegree {
    Zero,
    One,
    Two,
    #[default]
    Three,
}

impl ShDegree {
    /// The degree as a number.
    #[inline]
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// `(degree + 1) ^ 2`
    #[inline]
    pub const fn coefficient_count(self) -> usize {
        (self as usize + 1).pow(2)
    }
}

impl TryFrom<u32> for ShDegree {
    type Error = Error;

    fn try_from(degree: u32) -> Result<Self, Self::Error> {
        Ok(match degree {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            _ => return Err(Error::UnsupportedShDegree(degree)),
        })
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn degree_from_value() {
        use super::*;

        assert_eq!(ShDegree::try_from(0).unwrap(), ShDegree::Zero);
        assert_eq!(ShDegree::try_from(3).unwrap(), ShDegree::Three);
        assert_eq!(ShDegree::Two.value(), 2);
        assert_eq!(ShDegree::Two.coefficient_count(), 9);
        assert_eq!(ShDegree::default().coefficient_count(), SH_COUNT_MAX);

        let error = ShDegree::try_from(4).unwrap_err();
        assert!(matches!(error, Error::UnsupportedShDegree(4)), "{error:?}");
    }

    #[test]
    fn coefficients_match_their_definitions() {
        use super::*;
        use std::f64::consts::PI;

        let targets = [
            (SH_COEF.0[0], (1.0 / 4.0 / PI).sqrt()),
            (SH_COEF.1[1], (3.0 / 4.0 / PI).sqrt()),
            (SH_COEF.2[2], (5.0 / 16.0 / PI).sqrt()),
            (SH_COEF.2[4], (15.0 / 16.0 / PI).sqrt()),
            (SH_COEF.3[1], (105.0 / 4.0 / PI).sqrt()),
            (SH_COEF.3[3], (7.0 / 16.0 / PI).sqrt()),
        ];
        for (output, target) in targets {
            assert!((output - target as f32).abs() <= f32::EPSILON, "{output}");
        }
    }
}
