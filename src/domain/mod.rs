// Domain layer: record shapes and the relation bus port. No I/O here.

pub mod model;
pub mod ports;
