//! Storage encodings of SH coefficients.

pub use super::*;

use crate::packing::{pack2x16float, pack4x8snorm, unpack1x16float, unpack1x8snorm};
use std::{fmt, str::FromStr};

/// The numeric encoding of SH coefficients, fixed for a whole dataset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ShEncoding {
    /// Three `f32` per coefficient.
    #[default]
    Float,
    /// Two `f16` per word.
    Half,
    /// Four signed-normalized bytes per word.
    Byte,
}

/// SH coefficients of all rows in one of the [encodings](ShEncoding).
///
/// Each row holds `(D + 1) ^ 2` coefficients of RGB,
/// padded to whole words.
#[derive(Clone, PartialEq)]
pub enum ShBuffer {
    Float(Vec<f32>),
    Half(Vec<u32>),
    Byte(Vec<u32>),
}

/// A table of SH coefficients with its degree.
#[derive(Clone, PartialEq)]
pub struct ShTable {
    pub buffer: ShBuffer,
    pub degree: ShDegree,
}

/// Reading one coefficient of RGB from a row.
pub trait ShCoefficients: Sync {
    /// `index` should be less than the coefficient count of the degree.
    fn coefficient(
        &self,
        row: u32,
        index: usize,
    ) -> [f32; 3];
}

/// The rescale of coefficient 0 in [`ShEncoding::Byte`].
pub const BYTE_SCALE_DC: f32 = 4.0;
/// The rescale of the other coefficients in [`ShEncoding::Byte`].
pub const BYTE_SCALE_REST: f32 = 0.5;

impl ShEncoding {
    /// The count of words (or floats) in a row of `degree`.
    #[inline]
    pub const fn row_stride(
        self,
        degree: ShDegree,
    ) -> usize {
        let component_count = degree.coefficient_count() * 3;
        match self {
            Self::Float => component_count,
            Self::Half => component_count.div_ceil(2),
            Self::Byte => component_count.div_ceil(4),
        }
    }

    /// The size of a row in bytes.
    #[inline]
    pub const fn row_size(
        self,
        degree: ShDegree,
    ) -> usize {
        self.row_stride(degree) * 4
    }
}

impl FromStr for ShEncoding {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name.to_ascii_lowercase().as_str() {
            "float" | "f32" => Self::Float,
            "half" | "f16" => Self::Half,
            "byte" | "snorm8" => Self::Byte,
            _ => return Err(Error::UnsupportedShEncoding(name.to_owned())),
        })
    }
}

impl fmt::Display for ShEncoding {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "float",
            Self::Half => "half",
            Self::Byte => "byte",
        })
    }
}

impl ShTable {
    /// Encoding the leading `(D + 1) ^ 2` coefficients of each row.
    pub fn encode(
        encoding: ShEncoding,
        degree: ShDegree,
        rows: &[[[f32; 3]; SH_COUNT_MAX]],
    ) -> Self {
        let count = degree.coefficient_count();
        let stride = encoding.row_stride(degree);
        let components = |row: &[[f32; 3]; SH_COUNT_MAX]| {
            row[..count].iter().flatten().copied().collect::<Vec<_>>()
        };

        let buffer = match encoding {
            ShEncoding::Float => {
                ShBuffer::Float(rows.iter().flat_map(components).collect())
            },
            ShEncoding::Half => {
                let mut words = Vec::with_capacity(rows.len() * stride);
                for row in rows {
                    let values = components(row);
                    words.extend(values.chunks(2).map(|pair| {
                        pack2x16float([pair[0], pair.get(1).copied().unwrap_or(0.0)])
                    }));
                }
                ShBuffer::Half(words)
            },
            ShEncoding::Byte => {
                let mut words = Vec::with_capacity(rows.len() * stride);
                for row in rows {
                    let values = components(row)
                        .into_iter()
                        .enumerate()
                        .map(|(component, value)| {
                            let scale = if component < 3 {
                                BYTE_SCALE_DC
                            } else {
                                BYTE_SCALE_REST
                            };
                            value / scale
                        })
                        .collect::<Vec<_>>();
                    words.extend(values.chunks(4).map(|quad| {
                        let mut lanes = [0.0; 4];
                        lanes[..quad.len()].copy_from_slice(quad);
                        pack4x8snorm(lanes)
                    }));
                }
                ShBuffer::Byte(words)
            },
        };

        Self { buffer, degree }
    }

    /// The encoding of the buffer.
    #[inline]
    pub fn encoding(&self) -> ShEncoding {
        match self.buffer {
            ShBuffer::Float(_) => ShEncoding::Float,
            ShBuffer::Half(_) => ShEncoding::Half,
            ShBuffer::Byte(_) => ShEncoding::Byte,
        }
    }

    /// The count of words (or floats) in a row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.encoding().row_stride(self.degree)
    }

    /// The count of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        let length = match &self.buffer {
            ShBuffer::Float(words) => words.len(),
            ShBuffer::Half(words) | ShBuffer::Byte(words) => words.len(),
        };
        length / self.row_stride()
    }

    /// Size of the buffer in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.row_count() * self.encoding().row_size(self.degree)
    }

    /// Checking that the buffer holds whole rows.
    pub fn validate(&self) -> Result<(), Error> {
        let length = match &self.buffer {
            ShBuffer::Float(words) => words.len(),
            ShBuffer::Half(words) | ShBuffer::Byte(words) => words.len(),
        };
        let stride = self.row_stride();
        if length % stride != 0 {
            return Err(Error::Validation(
                format!("the length of {} SH buffer ({length})", self.encoding()),
                format!("a multiple of {stride}"),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ShTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ShTable")
            .field("encoding", &self.encoding())
            .field("degree", &self.degree)
            .field("row_count", &self.row_count())
            .finish()
    }
}

/// Reader of [`ShBuffer::Float`].
#[derive(Clone, Copy, Debug)]
pub struct FloatReader<'a> {
    pub stride: usize,
    pub words: &'a [f32],
}

/// Reader of [`ShBuffer::Half`].
#[derive(Clone, Copy, Debug)]
pub struct HalfReader<'a> {
    pub stride: usize,
    pub words: &'a [u32],
}

/// Reader of [`ShBuffer::Byte`].
#[derive(Clone, Copy, Debug)]
pub struct ByteReader<'a> {
    pub stride: usize,
    pub words: &'a [u32],
}

impl ShCoefficients for FloatReader<'_> {
    #[inline]
    fn coefficient(
        &self,
        row: u32,
        index: usize,
    ) -> [f32; 3] {
        let offset = row as usize * self.stride + index * 3;
        let c = &self.words[offset..offset + 3];
        [c[0], c[1], c[2]]
    }
}

impl ShCoefficients for HalfReader<'_> {
    /// The coefficient starts at the low lane of a word if `index` is even,
    /// or at the high lane otherwise.
    #[inline]
    fn coefficient(
        &self,
        row: u32,
        index: usize,
    ) -> [f32; 3] {
        let offset = row as usize * self.stride + index * 3 / 2;
        let w = &self.words[offset..];
        if index % 2 == 0 {
            [
                unpack1x16float(w[0], 0),
                unpack1x16float(w[0], 1),
                unpack1x16float(w[1], 0),
            ]
        } else {
            [
                unpack1x16float(w[0], 1),
                unpack1x16float(w[1], 0),
                unpack1x16float(w[1], 1),
            ]
        }
    }
}

impl ShCoefficients for ByteReader<'_> {
    /// The coefficient may straddle two words.
    #[inline]
    fn coefficient(
        &self,
        row: u32,
        index: usize,
    ) -> [f32; 3] {
        let start = index * 3;
        let offset = row as usize * self.stride;
        let scale = if index == 0 {
            BYTE_SCALE_DC
        } else {
            BYTE_SCALE_REST
        };
        [0, 1, 2].map(|component| {
            let byte = start + component;
            let word = self.words[offset + byte / 4];
            unpack1x8snorm(word, byte % 4) * scale
        })
    }
}

impl ShTable {
    /// Running `f` with the reader of the buffer.
    ///
    /// The encoding is resolved here once,
    /// so `f` is monomorphized for each reader.
    pub fn with_reader<T>(
        &self,
        f: impl ReaderFn<T>,
    ) -> T {
        let stride = self.row_stride();
        match &self.buffer {
            ShBuffer::Float(words) => f.call(&FloatReader { stride, words }),
            ShBuffer::Half(words) => f.call(&HalfReader { stride, words }),
            ShBuffer::Byte(words) => f.call(&ByteReader { stride, words }),
        }
    }
}

/// A function generic over the [SH readers](ShCoefficients).
pub trait ReaderFn<T> {
    fn call<C: ShCoefficients>(
        self,
        reader: &C,
    ) -> T;
}
