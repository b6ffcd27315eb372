pub mod aht;
pub mod keyboard;
pub mod pacing;
pub mod sched;
pub mod script;
pub mod session;
pub mod sim;
pub mod transport;
pub mod typist;
