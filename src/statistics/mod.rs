//! # Numerical support for the trajectory statistics engines
//!
//! Stateless routines shared by the grid model:
//!
//! * [`savitzky_golay`] – Savitzky-Golay smoothing with mean-value padding (CWT field smoothing).
//! * [`student_t`] – two-tailed Student-t quantiles by bisection (CWT confidence intervals).
//! * [`transport`] – error function, haversine distance and the natural transport potential (QTBA).
//!
//! Nothing in here allocates grid state; every function is a pure mapping of its arguments.

pub mod savitzky_golay;
pub mod student_t;
pub mod transport;

pub use savitzky_golay::smooth;
pub use student_t::critical_value;
pub use transport::{erf, haversine_km, natural_transport_potential};
