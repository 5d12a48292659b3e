mod utils;

pub mod test_prelude {
    pub use super::utils::*;
    pub use crate::{
        BatchReport, FailureKind, NoncePolicy, Registrar, RegistrarConfig, RegistrarError,
        ValidatorOutcome, ValidatorStage,
    };
    pub use alloy::primitives::{Address, U256};
    pub use eth::ValidatorRegistration;
    pub use ssv_types::*;
}
