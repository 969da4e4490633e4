//! Savitzky-Golay smoothing with mean-value boundary padding.
//!
//! The filter fits, around every sample, a least-squares polynomial of degree `poly_degree` over
//! a symmetric window of `nl + nr + 1` samples and replaces the sample by the value of the fitted
//! polynomial at the window centre. The fit is linear in the data, so it reduces to a fixed
//! convolution whose coefficients are the first row of the pseudo-inverse `(AᵀA)⁻¹Aᵀ` of the
//! Vandermonde design matrix `A[r][c] = (r − nl)^c`.
//!
//! The window does not fit at both ends of the sequence. Each end is therefore extended with
//! `2·nLR` synthetic samples equal to the mean of the `2·nLR` real samples next to it before
//! convolving. Only the original positions are returned.

use nalgebra::{DMatrix, DVector};

use crate::metcor_errors::MetcorError;

/// Half-width of the window for a requested filter length.
///
/// Odd lengths map to `(L − 1) / 2`, even lengths to `L / 2`.
pub fn half_window(filter_length: usize) -> usize {
    if filter_length % 2 == 1 {
        (filter_length - 1) / 2
    } else {
        filter_length / 2
    }
}

/// Convolution coefficients of the smoothing filter, ordered from offset `−nl` to `+nr`.
///
/// Arguments
/// -----------------
/// * `nl`, `nr`: number of samples on the left/right of the centre.
/// * `poly_degree`: degree of the local least-squares polynomial.
///
/// Return
/// ----------
/// * A vector of `nl + nr + 1` coefficients, or [`MetcorError::InvalidParameter`] when the window
///   is too short for the degree.
pub fn savgol_coefficients(
    nl: usize,
    nr: usize,
    poly_degree: usize,
) -> Result<DVector<f64>, MetcorError> {
    let window = nl + nr + 1;
    if poly_degree >= window {
        return Err(MetcorError::InvalidParameter(format!(
            "polynomial degree {poly_degree} requires a window wider than {window}"
        )));
    }

    let design = DMatrix::from_fn(window, poly_degree + 1, |r, c| {
        (r as f64 - nl as f64).powi(c as i32)
    });
    let normal = design.transpose() * &design;
    let inverse = normal.try_inverse().ok_or_else(|| {
        MetcorError::InvalidParameter("singular Savitzky-Golay normal matrix".into())
    })?;
    let projection = inverse * design.transpose();

    Ok(projection.row(0).transpose())
}

/// Smooth `raw` with a Savitzky-Golay filter of length `filter_length` and degree `poly_degree`.
///
/// Both ends are padded with `2·nLR` copies of the mean of the `2·nLR` nearest samples
/// (or of every sample if the sequence is shorter). An empty input yields an empty output, and a
/// filter with a zero half-width returns the input unchanged.
pub fn smooth(raw: &[f64], filter_length: usize, poly_degree: usize) -> Result<Vec<f64>, MetcorError> {
    let nlr = half_window(filter_length);
    if raw.is_empty() || nlr == 0 {
        return Ok(raw.to_vec());
    }

    let coeffs = savgol_coefficients(nlr, nlr, poly_degree)?;
    let pad = 2 * nlr;
    let span = pad.min(raw.len());

    let left_mean = raw[..span].iter().sum::<f64>() / span as f64;
    let right_mean = raw[raw.len() - span..].iter().sum::<f64>() / span as f64;

    let mut padded = Vec::with_capacity(raw.len() + 2 * pad);
    padded.extend(std::iter::repeat(left_mean).take(pad));
    padded.extend_from_slice(raw);
    padded.extend(std::iter::repeat(right_mean).take(pad));

    let smoothed = (0..raw.len())
        .map(|i| {
            let start = i + pad - nlr;
            coeffs
                .iter()
                .zip(&padded[start..start + coeffs.len()])
                .map(|(c, x)| c * x)
                .sum()
        })
        .collect();

    Ok(smoothed)
}
