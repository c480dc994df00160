//! Spoken announcements: the speech seam, timers and the debounce throttle.

pub mod clock;
pub mod speaker;
pub mod throttle;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use speaker::{
    CollectorSpeaker, CommandExecutor, CommandSpeaker, PrintSpeaker, Speaker,
    SystemCommandExecutor,
};
pub use throttle::{AnnouncementThrottle, DebouncePolicy, ThrottleState};
pub use timer::{ManualTimer, ThreadTimer, Timer, TimerHandle, TimerTask};
