//! Evaluating SH coefficients into RGB colors.

pub use super::*;

/// The bias re-centering the colors, which are stored around zero.
pub const COLOR_BIAS: f32 = 0.5;

/// Evaluating the SH coefficients of `row` along `direction`.
///
/// ## Arguments
///
/// * `direction` - A unit vector from the view position to the point.
/// * `degree` - Coefficients beyond it are never read.
///
/// ## Details
///
/// $$ C_{rgb} = \sum_{l=0}^{D} \sum_{m=-l}^{l} Y_l^m(D_v) \cdot C_{sh,l,m} + 0.5 $$
pub fn evaluate<C: ShCoefficients + ?Sized>(
    coefficients: &C,
    row: u32,
    direction: [f32; 3],
    degree: ShDegree,
) -> [f32; 3] {
    match degree {
        ShDegree::Zero => evaluate_at::<0, C>(coefficients, row, direction),
        ShDegree::One => evaluate_at::<1, C>(coefficients, row, direction),
        ShDegree::Two => evaluate_at::<2, C>(coefficients, row, direction),
        ShDegree::Three => evaluate_at::<3, C>(coefficients, row, direction),
    }
}

/// [`evaluate`] with the degree `D` fixed at compile time.
///
/// Kernels resolve the degree once per dispatch and call this per invocation.
/// `D` should be no more than [`SH_DEGREE_MAX`].
pub fn evaluate_at<const D: u32, C: ShCoefficients + ?Sized>(
    coefficients: &C,
    row: u32,
    direction: [f32; 3],
) -> [f32; 3] {
    let c = |index: usize| coefficients.coefficient(row, index);
    let mut color = [0.0; 3];
    let mut accumulate = |index: usize, basis: f32| {
        let coefficient = c(index);
        color[0] += basis * coefficient[0];
        color[1] += basis * coefficient[1];
        color[2] += basis * coefficient[2];
    };

    accumulate(0, SH_COEF.0[0]);

    if D >= 1 {
        let [x, y, z] = direction;
        accumulate(1, SH_COEF.1[0] * y);
        accumulate(2, SH_COEF.1[1] * z);
        accumulate(3, SH_COEF.1[2] * x);

        if D >= 2 {
            let (xx, yy, zz) = (x * x, y * y, z * z);
            let (xy, yz, xz) = (x * y, y * z, x * z);
            accumulate(4, SH_COEF.2[0] * xy);
            accumulate(5, SH_COEF.2[1] * yz);
            accumulate(6, SH_COEF.2[2] * (2.0 * zz - xx - yy));
            accumulate(7, SH_COEF.2[3] * xz);
            accumulate(8, SH_COEF.2[4] * (xx - yy));

            if D >= 3 {
                accumulate(9, SH_COEF.3[0] * y * (3.0 * xx - yy));
                accumulate(10, SH_COEF.3[1] * xy * z);
                accumulate(11, SH_COEF.3[2] * y * (4.0 * zz - xx - yy));
                accumulate(12, SH_COEF.3[3] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy));
                accumulate(13, SH_COEF.3[4] * x * (4.0 * zz - xx - yy));
                accumulate(14, SH_COEF.3[5] * z * (xx - yy));
                accumulate(15, SH_COEF.3[6] * x * (xx - 3.0 * yy));
            }
        }
    }

    color.map(|c| c + COLOR_BIAS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Failing on any read beyond `limit`.
    struct Bounded<'a> {
        inner: FloatReader<'a>,
        limit: usize,
        reads: AtomicUsize,
    }

    impl ShCoefficients for Bounded<'_> {
        fn coefficient(
            &self,
            row: u32,
            index: usize,
        ) -> [f32; 3] {
            assert!(index < self.limit, "{index} should be less than {}", self.limit);
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.coefficient(row, index)
        }
    }

    fn random_rows(count: usize) -> Vec<[[f32; 3]; SH_COUNT_MAX]> {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        (0..count)
            .map(|_| {
                std::array::from_fn(|index| {
                    let bound = if index == 0 { 1.5 } else { 0.45 };
                    std::array::from_fn(|_| rng.gen_range(-bound..bound))
                })
            })
            .collect()
    }

    fn normalize(v: [f32; 3]) -> [f32; 3] {
        let norm = v.iter().map(|v| v * v).sum::<f32>().sqrt();
        v.map(|v| v / norm)
    }

    struct EvaluateAt {
        direction: [f32; 3],
        degree: ShDegree,
        rows: u32,
    }

    impl ReaderFn<Vec<[f32; 3]>> for EvaluateAt {
        fn call<C: ShCoefficients>(
            self,
            reader: &C,
        ) -> Vec<[f32; 3]> {
            (0..self.rows)
                .map(|row| evaluate(reader, row, self.direction, self.degree))
                .collect()
        }
    }

    #[test]
    fn degree_zero_is_independent_of_direction() {
        let words = [0.2, -0.4, 1.0];
        let reader = FloatReader { stride: 3, words: &words };
        let target = [
            0.28209479177387814 * 0.2 + 0.5,
            0.28209479177387814 * -0.4 + 0.5,
            0.28209479177387814 * 1.0 + 0.5,
        ];

        for direction in [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], normalize([1.0, -2.0, 3.0])] {
            let output = evaluate(&reader, 0, direction, ShDegree::Zero);
            assert_eq!(output, target);
        }
    }

    #[test]
    fn degrees_beyond_maximum_are_not_read() {
        let rows = random_rows(2);
        let table = ShTable::encode(ShEncoding::Float, ShDegree::Three, &rows);
        let ShBuffer::Float(words) = &table.buffer else {
            unreachable!()
        };

        for degree in [ShDegree::Zero, ShDegree::One, ShDegree::Two, ShDegree::Three] {
            let reader = Bounded {
                inner: FloatReader { stride: 48, words },
                limit: degree.coefficient_count(),
                reads: AtomicUsize::new(0),
            };
            evaluate(&reader, 1, normalize([0.3, 0.4, -0.5]), degree);
            assert_eq!(reader.reads.into_inner(), degree.coefficient_count());
        }
    }

    #[test]
    fn fixed_degree_matches_runtime_degree() {
        let rows = random_rows(1);
        let table = ShTable::encode(ShEncoding::Float, ShDegree::Three, &rows);
        let ShBuffer::Float(words) = &table.buffer else {
            unreachable!()
        };
        let reader = FloatReader { stride: 48, words };
        let direction = normalize([-0.7, 0.1, 0.4]);

        assert_eq!(
            evaluate_at::<0, _>(&reader, 0, direction),
            evaluate(&reader, 0, direction, ShDegree::Zero),
        );
        assert_eq!(
            evaluate_at::<2, _>(&reader, 0, direction),
            evaluate(&reader, 0, direction, ShDegree::Two),
        );

        let bounded = Bounded {
            inner: reader,
            limit: 4,
            reads: AtomicUsize::new(0),
        };
        evaluate_at::<1, _>(&bounded, 0, direction);
        assert_eq!(bounded.reads.into_inner(), 4);
    }

    #[test]
    fn degree_one_follows_the_basis() {
        let mut words = [0.0; 12];
        // Coefficient 3 is paired with `-C1 * x`
        words[9..12].copy_from_slice(&[1.0, 0.0, -1.0]);
        let reader = FloatReader { stride: 12, words: &words };

        let output = evaluate(&reader, 0, [1.0, 0.0, 0.0], ShDegree::One);
        let c1 = 0.4886025119029199;
        assert_eq!(output, [0.5 - c1, 0.5, 0.5 + c1]);

        let output = evaluate(&reader, 0, [0.0, 1.0, 0.0], ShDegree::One);
        assert_eq!(output, [0.5; 3]);
    }

    #[test]
    fn encodings_match_float_within_quantization_error() {
        let rows = random_rows(64);
        let direction = normalize([0.6, -0.2, 0.8]);

        for degree in [ShDegree::Zero, ShDegree::One, ShDegree::Two, ShDegree::Three] {
            let evaluate_with = |encoding| {
                ShTable::encode(encoding, degree, &rows).with_reader(EvaluateAt {
                    direction,
                    degree,
                    rows: rows.len() as u32,
                })
            };
            let target = evaluate_with(ShEncoding::Float);
            let words = rows.iter().flatten().flatten().copied().collect::<Vec<_>>();
            let reader = FloatReader { stride: 48, words: &words };
            for (row, target) in target.iter().enumerate() {
                assert_eq!(&evaluate(&reader, row as u32, direction, degree), target);
            }

            for (encoding, tolerance) in [(ShEncoding::Half, 5e-3), (ShEncoding::Byte, 5e-2)] {
                let output = evaluate_with(encoding);
                for (output, target) in output.iter().zip(&target) {
                    for (o, t) in output.iter().zip(target) {
                        assert!(
                            (o - t).abs() <= tolerance,
                            "{encoding} at degree {degree:?}: {o} != {t}",
                        );
                    }
                }
            }
        }
    }
}
