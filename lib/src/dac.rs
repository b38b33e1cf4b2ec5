//! Conversion of beam coordinates into DAC codes.

use crate::DAC_BIT_WIDTH;

/// Smallest `p` with `2^p >= n`.
pub const fn ceil_log2(n: u32) -> u8 {
    if n <= 1 {
        0
    } else {
        (u32::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Rescale a position on a `2^scale_power` axis into a `bits`-wide DAC code.
///
/// Unipolar output maps `0..=2^scale_power` onto the full code range.  Dipole
/// output maps `-2^scale_power..=2^scale_power` onto the signed code range
/// and returns it in two's complement.
pub fn position_to_binary(pos: i32, scale_power: u8, bits: u8, dipole: bool) -> u16 {
    let bits = bits.clamp(1, DAC_BIT_WIDTH);
    let full = (1i64 << bits) - 1;
    // keeps the shifts below the width of i64
    let shift = (scale_power as u32).min(47);
    if dipole {
        let half = 1i64 << (bits - 1);
        let code = ((full * pos as i64) >> (shift + 1)).clamp(-half, half - 1);
        (code & full) as u16
    } else {
        let code = (full * pos.max(0) as i64) >> shift;
        code.min(full) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0, 0)]
    #[test_case(1, 0)]
    #[test_case(2, 1)]
    #[test_case(44, 6)]
    #[test_case(64, 6)]
    #[test_case(65, 7)]
    #[test_case(87, 7)]
    #[test_case(65536, 16)]
    fn ceil_log2_rounds_up(n: u32, pow: u8) {
        assert_eq!(ceil_log2(n), pow);
    }

    #[test_case(0,    4,  0x0000)]
    #[test_case(1,    4,  0x0fff)]
    #[test_case(5,    4,  0x4fff)]
    #[test_case(9,    4,  0x8fff)]
    #[test_case(10,   4,  0x9fff)]
    #[test_case(10,   7,  0x13ff)]
    #[test_case(50,   7,  0x63ff)]
    #[test_case(99,   7,  0xc5ff)]
    #[test_case(100,  7,  0xc7ff)]
    #[test_case(100,  10, 0x18ff)]
    #[test_case(500,  10, 0x7cff)]
    #[test_case(999,  10, 0xf9bf)]
    #[test_case(1000, 10, 0xf9ff)]
    fn unipolar_16_bits(pos: i32, power: u8, code: u16) {
        assert_eq!(position_to_binary(pos, power, 16, false), code);
    }

    #[test_case(0,    4,  0x0000)]
    #[test_case(1,    4,  0x07ff)]
    #[test_case(5,    4,  0x27ff)]
    #[test_case(9,    4,  0x47ff)]
    #[test_case(13,   4,  0x67ff)]
    #[test_case(10,   7,  0x09ff)]
    #[test_case(50,   7,  0x31ff)]
    #[test_case(99,   7,  0x62ff)]
    #[test_case(100,  7,  0x63ff)]
    #[test_case(100,  10, 0x0c7f)]
    #[test_case(500,  10, 0x3e7f)]
    #[test_case(999,  10, 0x7cdf)]
    #[test_case(1001, 10, 0x7d1f)]
    #[test_case(-1,   4,  0xf800)]
    fn dipole_16_bits(pos: i32, power: u8, code: u16) {
        assert_eq!(position_to_binary(pos, power, 16, true), code);
    }

    #[test]
    fn out_of_range_saturates() {
        assert_eq!(position_to_binary(-5, 4, 16, false), 0);
        assert_eq!(position_to_binary(100, 4, 16, false), 0xffff);
        assert_eq!(position_to_binary(100, 4, 16, true), 0x7fff);
        assert_eq!(position_to_binary(-100, 4, 16, true), 0x8000);
    }

    #[test]
    fn narrower_and_wider_dacs() {
        assert_eq!(position_to_binary(16, 4, 12, false), 0x0fff);
        assert_eq!(position_to_binary(-16, 4, 12, true), 0x0800);
        assert_eq!(position_to_binary(16, 4, 24, false), 0xffff);
    }
}
