// Domain layer: API body types and ports. No HTTP or process code lives here.

pub mod model;
pub mod ports;
