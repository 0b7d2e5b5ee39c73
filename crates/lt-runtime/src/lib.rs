#[macro_use]
mod log_macros;

pub mod clock;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod provision;
pub mod session;
pub mod settings;
pub mod signal;
pub mod store;
pub mod tracing_init;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{SessionEnd, SessionSummary, TailEngine};
pub use error::{RuntimeError, RuntimeReason, RuntimeResult};
pub use limiter::{LimiterClosed, PermitTicker, RateLimiter};
pub use provision::{FileProvisioner, Provisioned, Provisioner};
pub use session::{TailSession, TailStream};
pub use settings::{EngineSettings, build_request};
pub use store::{FileLogStore, MemoryLogStore};
