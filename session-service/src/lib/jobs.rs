pub mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
