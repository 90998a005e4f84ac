//! Input devices.  The node has one: the GPS receiver feeding telemetry.

pub mod gps;
