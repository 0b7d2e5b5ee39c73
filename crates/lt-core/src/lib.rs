pub mod cursor;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod query;
pub mod record;
pub mod request;
pub mod stats;

pub use cursor::{Cursor, WindowAdvance};
pub use dedup::Deduplicator;
pub use error::{TailError, TailReason, TailResult};
pub use filter::MatchFilter;
pub use query::{LogQuery, QueryClient, QueryError, QueryPage};
pub use record::RawRecord;
pub use request::{TailRequest, WindowEnd};
pub use stats::SessionStats;
