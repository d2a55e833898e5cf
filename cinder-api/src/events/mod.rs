pub mod bus;
pub mod publisher;

pub use bus::{ChangeBus, ChangeKind, ProfileChange};
