//! Connection parameters and the framed transport they describe.

pub mod params;
pub(crate) mod transport;
