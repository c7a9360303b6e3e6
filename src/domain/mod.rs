// Domain layer: scenario models and the ports (traits) stages and runners implement.

pub mod model;
pub mod ports;
