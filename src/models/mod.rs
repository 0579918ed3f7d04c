mod credentials;
mod devices;
mod interfaces;
mod reports;
mod vlans;

pub use credentials::*;
pub use devices::*;
pub use interfaces::*;
pub use reports::*;
pub use vlans::*;
