mod account;
mod customer;
mod money;

pub use account::*;
pub use customer::*;
pub use money::*;
