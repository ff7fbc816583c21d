pub mod client;
pub mod session;
pub mod state;
pub mod viewport;

pub use client::{FetchClient, GoalWriter};
pub use session::{EMPTY_STATE_MESSAGE, FrameFlavor, GoalSession, RenderFrame};
pub use state::SessionPhase;
pub use viewport::ViewportTracker;
