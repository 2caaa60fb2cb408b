//! Ephemeral, memory-resident store handing completed analyses from a POST to a later GET.

pub mod clock;
pub mod handle;
pub mod result_store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handle::{HandleSource, RandomHandles, ResultHandle};
pub use result_store::{ReadPolicy, ResultStore, StoreEntry};
pub use sweeper::spawn_sweeper;
