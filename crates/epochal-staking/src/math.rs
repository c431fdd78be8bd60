//! Fixed-point helpers
//!
//! Reward shares multiply two `u128` quantities (an amount and a weight)
//! before dividing. Both can be large base-unit values, so the product is
//! carried in 256 bits.

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of `a * b` as `(high, low)` words
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a0, a1) = (a & LOW_MASK, a >> 64);
    let (b0, b1) = (b & LOW_MASK, b >> 64);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let middle = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);
    let low = (p00 & LOW_MASK) | (middle << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (middle >> 64);
    (high, low)
}

/// `floor(a * b / c)` without intermediate overflow.
///
/// Returns `None` when `c` is zero or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Some(low / c);
    }
    if high >= c {
        return None;
    }

    // Binary long division of (high, low) by c; `rem` stays below c.
    let mut rem = high;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> i) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= c {
            rem = rem.wrapping_sub(c);
            quotient |= 1;
        }
    }
    Some(quotient)
}
