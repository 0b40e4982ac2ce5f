mod engine;
mod signal;

pub use engine::{ArbiterTiming, ArbitrationState, HitArbiter, HitDecision};
pub use signal::{HitRegistrar, HitSignal};
