//! AWS service clients and error handling

pub mod context;
pub mod ec2;
pub mod eks;
pub mod error;

pub use context::AwsContext;
pub use ec2::Ec2Client;
pub use eks::EksClient;
