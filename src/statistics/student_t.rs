//! Student-t quantiles without a special-function library.
//!
//! The two-tailed tail area of the Student distribution is evaluated with the classic finite
//! series in `cos²θ` (`θ = atan(t/√n)`), split on the parity of the degrees of freedom. The
//! quantile is then found by bisection on `v = 1/(1+t)`, which maps `t ∈ [0, ∞)` onto `(0, 1]`.

use std::f64::consts::FRAC_PI_2;

use crate::constants::STUDENT_T_TOLERANCE;

fn series(q: f64, start: f64, end: i64, b: f64) -> f64 {
    let mut term = 1.0;
    let mut sum = term;
    let mut k = start;
    while k <= end as f64 {
        term = term * q * k / (k - b);
        sum += term;
        k += 2.0;
    }
    sum
}

/// Two-tailed tail area `P(|T| ≥ t)` for `n` degrees of freedom.
pub fn two_tailed_area(t: f64, n: u32) -> f64 {
    let t = t.abs();
    let n_f = n as f64;
    let th = (t / n_f.sqrt()).atan();
    let (sth, cth) = th.sin_cos();

    if n == 1 {
        return 1.0 - th / FRAC_PI_2;
    }

    let end = n as i64 - 3;
    if n % 2 == 1 {
        1.0 - (th + sth * cth * series(cth * cth, 2.0, end, -1.0)) / FRAC_PI_2
    } else {
        1.0 - sth * series(cth * cth, 1.0, end, -1.0)
    }
}

/// Critical value `t` such that the two-tailed area beyond `±t` equals `p`.
///
/// Arguments
/// -----------------
/// * `p`: two-tailed area, i.e. `1 − confidence`.
/// * `n`: degrees of freedom.
///
/// Return
/// ----------
/// * The critical value, found by bisection to a step of `1e-6` on `1/(1+t)`.
pub fn critical_value(p: f64, n: u32) -> f64 {
    let mut v = 0.5;
    let mut dv = 0.5;
    let mut t = 0.0;
    while dv > STUDENT_T_TOLERANCE {
        t = 1.0 / v - 1.0;
        dv /= 2.0;
        if two_tailed_area(t, n) > p {
            v -= dv;
        } else {
            v += dv;
        }
    }
    t
}
