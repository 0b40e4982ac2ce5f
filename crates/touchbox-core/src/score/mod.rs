mod ledger;

pub use ledger::{Score, ScoreLedger, ScoreObserver, Side};
