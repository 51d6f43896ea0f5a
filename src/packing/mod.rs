//! Packed numeric storage.
//!
//! The functions follow the semantics of the WGSL builtins of the same names,
//! so the words can be shared with device kernels as they are.
//! Lane 0 always occupies the lowest bits of the word.

pub use half::f16;

/// Packing two floats into two half-precision lanes of a word.
#[inline]
pub fn pack2x16float(value: [f32; 2]) -> u32 {
    let x = f16::from_f32(value[0]).to_bits() as u32;
    let y = f16::from_f32(value[1]).to_bits() as u32;
    x | (y << 16)
}

/// Unpacking two half-precision lanes of a word into floats.
#[inline]
pub fn unpack2x16float(word: u32) -> [f32; 2] {
    [
        f16::from_bits(word as u16).to_f32(),
        f16::from_bits((word >> 16) as u16).to_f32(),
    ]
}

/// Packing four floats into four unsigned-normalized bytes of a word.
///
/// Values are clamped to `[0, 1]`.
#[inline]
pub fn pack4x8unorm(value: [f32; 4]) -> u32 {
    value.iter().enumerate().fold(0, |word, (lane, &v)| {
        let code = (0.5 + 255.0 * v.clamp(0.0, 1.0)).floor() as u32;
        word | (code << (lane * 8))
    })
}

/// Unpacking four unsigned-normalized bytes of a word into floats.
#[inline]
pub fn unpack4x8unorm(word: u32) -> [f32; 4] {
    [0, 1, 2, 3].map(|lane| ((word >> (lane * 8)) & 0xFF) as f32 / 255.0)
}

/// Packing four floats into four signed-normalized bytes of a word.
///
/// Values are clamped to `[-1, 1]`.
#[inline]
pub fn pack4x8snorm(value: [f32; 4]) -> u32 {
    value.iter().enumerate().fold(0, |word, (lane, &v)| {
        let code = (0.5 + 127.0 * v.clamp(-1.0, 1.0)).floor() as i8;
        word | ((code as u8 as u32) << (lane * 8))
    })
}

/// Unpacking four signed-normalized bytes of a word into floats.
#[inline]
pub fn unpack4x8snorm(word: u32) -> [f32; 4] {
    [0, 1, 2, 3].map(|lane| unpack1x8snorm(word, lane))
}

/// Unpacking one signed-normalized byte at `lane` (`0 ~ 3`) of a word.
#[inline]
pub fn unpack1x8snorm(
    word: u32,
    lane: usize,
) -> f32 {
    let code = (word >> (lane * 8)) as u8 as i8;
    (code as f32 / 127.0).max(-1.0)
}

/// Unpacking one half-precision lane at `lane` (`0 ~ 1`) of a word.
#[inline]
pub fn unpack1x16float(
    word: u32,
    lane: usize,
) -> f32 {
    f16::from_bits((word >> (lane * 16)) as u16).to_f32()
}
