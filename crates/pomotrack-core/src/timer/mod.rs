mod countdown;
mod slot;

pub use countdown::Countdown;
pub use slot::{TimerKind, TimerSlot};
