pub mod diff;
pub mod graph;
pub mod synth;
pub mod validate;
