pub mod bootstrap;
pub mod transport;
pub mod upstream;

pub use transport::DoqUpstream;
pub use upstream::Upstream;
