//! Controller layer: page events, the three page behaviors, and attach-time orchestration.

pub mod district_loader;
pub mod events;
pub mod orchestration;
pub mod save_toggle;
pub mod sync;
