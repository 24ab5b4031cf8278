pub mod models;
pub mod pii;

pub use models::events::{SlotChange, SlotChangedEvent};
pub use pii::Masked;
