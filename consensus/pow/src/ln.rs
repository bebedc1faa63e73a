//! Arbitrary-precision `ln(1 - p)` for `p` near zero, via the Mercator
//! series `ln(1 - p) = -sum_{k>=1} p^k / k`. Unlike `(1.0_f64 - p).ln()`,
//! this never forms `1 - p` and so never cancels when `p` underflows the
//! gap between 1.0 and its next representable `f64`.

use bigdecimal::BigDecimal;
use std::str::FromStr;

const MAX_TERMS: u32 = 2000;

pub fn ln_1_minus_p(p: &BigDecimal, scale: i64) -> BigDecimal {
    let epsilon = BigDecimal::from_str(&format!("1e-{}", scale + 10)).expect("valid exponential literal");
    let mut term = p.clone();
    let mut sum = BigDecimal::from(0);
    let mut k: u32 = 1;
    loop {
        let contribution = (&term / BigDecimal::from(k)).with_scale(scale);
        sum += &contribution;
        k += 1;
        if contribution.abs() < epsilon || k > MAX_TERMS {
            break;
        }
        term = (&term * p).with_scale(scale);
    }
    -sum
}
