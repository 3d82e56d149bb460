//! External geographic lookups: region labels and place search.

pub mod nominatim;
pub mod region;
