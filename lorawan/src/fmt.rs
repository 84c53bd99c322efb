//! Logging facade
//!
//! Call sites use `crate::fmt::{debug, error, ...}` and stay agnostic of the
//! backend: `defmt` when the `defmt` feature is enabled, the `log` facade
//! otherwise.

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
pub(crate) use log::{debug, error, info, warn};
