mod dispatcher;
mod state;
mod throttle;

pub use dispatcher::Dispatcher;
pub use state::{SessionEvent, SessionState};
pub use throttle::MoveInputThrottle;
