//! Flag-producing 8-bit arithmetic.
//!
//! These are pure functions: they return the new accumulator (and B, for
//! MUL/DIV) together with the flags the caller must store in PSW. Parity is
//! not returned since it follows from the accumulator value alone, see
//! [`crate::Cpu::a_set`].

/// `true` when `value` has an odd number of set bits.
#[inline(always)]
pub fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 1
}

/// ADD without incoming carry. Returns `(A, CY, OV, AC)`.
#[inline(always)]
pub fn add(a: u8, v: u8) -> (u8, bool, bool, bool) {
    let sum = a as u16 + v as u16;
    let c7 = sum > 0xFF;
    let c6 = (a & 0x7F) + (v & 0x7F) > 0x7F;
    let ac = (a & 0x0F) + (v & 0x0F) > 0x0F;
    (sum as u8, c7, c6 ^ c7, ac)
}

/// SUBB with incoming borrow. Returns `(A, CY, OV, AC)`.
#[inline(always)]
pub fn subb(a: u8, v: u8, c: bool) -> (u8, bool, bool, bool) {
    let c = c as u8;
    let diff = (a as u16).wrapping_sub(v as u16).wrapping_sub(c as u16);
    let c7 = diff > 0xFF;
    let c6 = (a & 0x7F) < (v & 0x7F) + c;
    let ac = (a & 0x0F) < (v & 0x0F) + c;
    (diff as u8, c7, c6 ^ c7, ac)
}

/// MUL AB. Returns `(A, B, CY, OV)`; CY is always clear and OV is set when
/// the product does not fit in A.
#[inline(always)]
pub fn mul(a: u8, b: u8) -> (u8, u8, bool, bool) {
    let product = a as u16 * b as u16;
    let hi = (product >> 8) as u8;
    (product as u8, hi, false, hi != 0)
}

/// DIV AB. Returns `(A, B, CY, OV)`.
///
/// Division by zero sets OV and leaves both operands as they were.
#[inline(always)]
pub fn div(a: u8, b: u8) -> (u8, u8, bool, bool) {
    if b == 0 {
        return (a, b, false, true);
    }
    (a / b, a % b, false, false)
}

#[inline(always)]
pub fn rl(a: u8) -> u8 {
    a.rotate_left(1)
}

#[inline(always)]
pub fn rr(a: u8) -> u8 {
    a.rotate_right(1)
}

/// Rotate left through carry. Returns `(A, CY)`.
#[inline(always)]
pub fn rlc(a: u8, c: bool) -> (u8, bool) {
    ((a << 1) | c as u8, a & 0x80 != 0)
}

/// Rotate right through carry. Returns `(A, CY)`.
#[inline(always)]
pub fn rrc(a: u8, c: bool) -> (u8, bool) {
    ((a >> 1) | if c { 0x80 } else { 0x00 }, a & 0x01 != 0)
}

#[inline(always)]
pub fn swap_nibbles(a: u8) -> u8 {
    a.rotate_left(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: [u8; 5] = [0x00, 0x01, 0x7F, 0x80, 0xFF];

    #[test]
    fn add_flags_on_boundaries() {
        for a in BOUNDARY {
            for v in BOUNDARY {
                let (r, cy, ov, ac) = add(a, v);
                assert_eq!(r, a.wrapping_add(v));
                assert_eq!(cy, a as u16 + v as u16 > 0xFF, "CY {a:02X}+{v:02X}");
                assert_eq!(
                    ov,
                    (a as i8).checked_add(v as i8).is_none(),
                    "OV {a:02X}+{v:02X}"
                );
                assert_eq!(ac, (a & 0x0F) + (v & 0x0F) > 0x0F, "AC {a:02X}+{v:02X}");
            }
        }
    }

    #[test]
    fn subb_flags_on_boundaries() {
        for c in [false, true] {
            for a in BOUNDARY {
                for v in BOUNDARY {
                    let (r, cy, ov, ac) = subb(a, v, c);
                    let borrow = c as i16;
                    assert_eq!(r, a.wrapping_sub(v).wrapping_sub(c as u8));
                    assert_eq!(cy, (a as i16) < v as i16 + borrow, "CY {a:02X}-{v:02X}-{c}");
                    let signed = a as i8 as i16 - v as i8 as i16 - borrow;
                    assert_eq!(ov, !(-128..=127).contains(&signed), "OV {a:02X}-{v:02X}-{c}");
                    assert_eq!(
                        ac,
                        ((a & 0x0F) as i16) < (v & 0x0F) as i16 + borrow,
                        "AC {a:02X}-{v:02X}-{c}"
                    );
                }
            }
        }
    }

    #[test]
    fn add_ff_plus_one() {
        assert_eq!(add(0xFF, 0x01), (0x00, true, false, true));
    }

    #[test]
    fn subb_borrow_wraps() {
        // 0x00 - 0x01 borrows out of both nibbles; signed 0 - 1 is in range
        assert_eq!(subb(0x00, 0x01, false), (0xFF, true, false, true));
        // 0x80 - 0x01: signed -128 - 1 overflows
        assert_eq!(subb(0x80, 0x01, false), (0x7F, false, true, true));
    }

    #[test]
    fn mul_sets_ov_on_wide_product() {
        assert_eq!(mul(0x50, 0xA0), (0x00, 0x32, false, true));
        assert_eq!(mul(0x0F, 0x02), (0x1E, 0x00, false, false));
    }

    #[test]
    fn div_by_zero_keeps_operands() {
        assert_eq!(div(0x42, 0x00), (0x42, 0x00, false, true));
        assert_eq!(div(0xFB, 0x12), (0x0D, 0x11, false, false));
    }

    #[test]
    fn rotates() {
        assert_eq!(rl(0x81), 0x03);
        assert_eq!(rr(0x81), 0xC0);
        assert_eq!(rlc(0x81, false), (0x02, true));
        assert_eq!(rlc(0x01, true), (0x03, false));
        assert_eq!(rrc(0x81, false), (0x40, true));
        assert_eq!(rrc(0x02, true), (0x81, false));
        assert_eq!(swap_nibbles(0x5A), 0xA5);
    }
}
