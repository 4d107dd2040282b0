pub mod clock;
pub mod engine;
pub mod state;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ResyncOutcome, TickOutcome, TimerEngine, TimerError, Visibility};
pub use state::{AnchorRecord, PersistedTimer, TimerMode, TimerSnapshot, TimerState};
pub use ticker::spawn_ticker;
