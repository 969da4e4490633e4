//! Great-circle distance and the natural transport potential kernel used by QTBA.

use std::f64::consts::{PI, SQRT_2};

use crate::constants::{
    Degree, Hour, Kilometer, KmPerHour, EARTH_EQUATORIAL_RADIUS_KM, PI_360, RADEG,
    ZERO_LAG_TRANSPORT_POTENTIAL,
};

/// Error function, Chebyshev fit with fractional error below `1.2e-7` everywhere.
pub fn erf(z: f64) -> f64 {
    if z == 0.0 {
        return 0.0;
    }

    let t = 1.0 / (1.0 + 0.5 * z.abs());
    // Horner evaluation of the fitted polynomial
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = 1.0 - t * poly.exp();

    if z >= 0.0 {
        ans
    } else {
        -ans
    }
}

/// Haversine distance (km) between an endpoint `(lat, lon)` and a receptor `(lat_r, lon_r)`.
///
/// Uses the equatorial Earth radius.
pub fn haversine_km(lat: Degree, lon: Degree, lat_r: Degree, lon_r: Degree) -> Kilometer {
    let d_lat = (PI_360 * (lat - lat_r)).sin();
    let d_lon = (PI_360 * (lon - lon_r)).sin();
    let a = d_lat.powi(2) + (RADEG * lat_r).cos() * (RADEG * lat).cos() * d_lon.powi(2);
    2.0 * EARTH_EQUATORIAL_RADIUS_KM * a.sqrt().asin()
}

/// Natural transport potential of an endpoint.
///
/// Arguments
/// -----------------
/// * `lag`: temporal distance from the receptor (hours); only its magnitude matters.
/// * `distance`: spatial distance from the receptor (km), see [`haversine_km`].
/// * `dispersion`: atmospheric dispersion velocity `a` (km/h).
///
/// Return
/// ----------
/// * `1 / (2aT·√(2π)·d) · (1 − erf(d / (T·a·√2)))`, or `1e9` for a zero lag.
pub fn natural_transport_potential(lag: Hour, distance: Kilometer, dispersion: KmPerHour) -> f64 {
    let t = lag.abs();
    if t == 0.0 {
        return ZERO_LAG_TRANSPORT_POTENTIAL;
    }

    let scale = 1.0 / ((2.0 * dispersion * t) * (2.0 * PI).sqrt() * distance);
    scale * (1.0 - erf(distance / (t * dispersion * SQRT_2)))
}
