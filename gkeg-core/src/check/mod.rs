pub mod dependencies;
pub mod doctor;

pub use dependencies::{ensure_managed_present, managed_presence, PresenceReport};
pub use doctor::{diagnose, DoctorReport};
