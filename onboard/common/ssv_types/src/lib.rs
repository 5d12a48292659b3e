pub use cluster::ClusterSnapshot;
pub use operator::{Operator, OperatorId};
pub use share::{KeyShare, Share, ENCRYPTED_KEY_LENGTH};
pub use util::parse_rsa;
mod cluster;
mod operator;
mod share;
mod util;
