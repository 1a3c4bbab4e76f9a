//! Observable camera state
//!
//! `CameraStateStore` is an explicitly constructed context object; there is
//! no process-wide instance. Pass it (usually as `Arc<CameraStateStore>`)
//! to the pipeline controller and the recording coordinator.

mod cell;
mod store;

pub use cell::{StateCell, Subscription};
pub use store::{CameraStateSnapshot, CameraStateStore};
