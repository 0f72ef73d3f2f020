mod init;
mod punch;

pub use init::cmd_init;
pub use punch::{cmd_punch, parse_punch_time};
