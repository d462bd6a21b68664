//! Component watching and the restart coordinator
//!
//! - `file_watch`: poll-based notifications for the component file
//! - `detector`: classifies a new file text into a [`ChangeEvent`]
//! - `coordinator`: the per-session state machine and the dev loop driving it

pub mod coordinator;
pub mod detector;
pub mod file_watch;

pub use coordinator::{
    CoordinatorState, DevLoop, Exit, Launcher, LiveSession, Outcome, SessionCoordinator,
};
pub use detector::{ChangeDetector, ChangeEvent, WatchSnapshot};
pub use file_watch::FileWatch;
