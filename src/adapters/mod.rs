// Adapters layer: concrete backends behind the domain ports.

pub mod memory;
pub mod rest;
