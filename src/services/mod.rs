pub mod archive;
pub mod provision;

pub use archive::VlanArchive;
pub use provision::Provisioner;
