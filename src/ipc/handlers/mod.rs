pub mod attendance;
pub mod core;
pub mod roll;
pub mod roster;
