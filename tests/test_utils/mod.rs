pub mod collectors;

#[allow(unused_imports)]
pub use collectors::{TcpCollector, UdpCollector};
