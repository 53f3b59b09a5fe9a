// Domain layer: models and the ports the backend client has to provide.

pub mod model;
pub mod ports;
