//! Register byte-codec and structure-field resolution for a time-travel
//! debugging trace model. Decides how a register's raw bit pattern moves
//! between the trace's canonical per-snapshot byte arrays, structured
//! register values, and the human-facing representation.

pub mod trace;
