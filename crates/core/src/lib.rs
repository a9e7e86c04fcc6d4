pub mod engine;
pub mod error;
pub mod leveling;
pub mod model;
pub mod onboarding;
pub mod player;
pub mod speech;
pub mod time;
pub mod widgets;

pub use error::Error;
pub use time::Clock;
