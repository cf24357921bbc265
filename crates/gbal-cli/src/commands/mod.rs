pub mod balance;
pub mod net_position;
pub mod pf;
