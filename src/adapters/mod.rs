// Adapters layer: concrete relation buses.

pub mod memory;
