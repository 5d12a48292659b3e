use crate::state::NoncePolicy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[clap(
    name = "onboard",
    about = "Splits validator keys into SSV key shares and registers them with the SSV network",
    long_about = "Reads EIP-2335 keystores, splits every validator key across a fixed set of SSV \
                  operators and registers each validator with the SSV network contract on behalf \
                  of the owner account. Validators are processed one at a time so that every \
                  registration is signed with the owner nonce the network expects.",
    version
)]
pub struct Onboard {
    /* Execution layer */
    #[clap(
        long,
        env = "RPC_URI",
        value_name = "URL",
        help = "HTTP endpoint of an execution node used to read contract events and send \
                transactions",
        display_order = 0
    )]
    pub rpc_url: String,

    #[clap(
        long,
        env = "OWNER_PRIVATE_KEY",
        value_name = "HEX",
        hide_env_values = true,
        help = "Private key of the account that owns the validators and pays for the \
                registrations",
        display_order = 0
    )]
    pub owner_private_key: String,

    #[clap(
        long,
        value_name = "NETWORK",
        env = "SSV_NETWORK",
        help = "Use the SSV network contract address and deployment block of a known network. \
                One of mainnet, holesky",
        display_order = 0
    )]
    pub network: Option<String>,

    #[clap(
        long,
        env = "SSV_NETWORK_ADDRESS",
        value_name = "ADDRESS",
        help = "Address of the SSV network contract. Overrides the --network preset",
        display_order = 0
    )]
    pub registry_address: Option<String>,

    #[clap(
        long,
        env = "SSV_TOKEN_ADDRESS",
        value_name = "ADDRESS",
        help = "Address of the SSV token contract",
        display_order = 0
    )]
    pub token_address: String,

    #[clap(
        long,
        value_name = "BLOCK",
        help = "Block to start scanning SSV network events from. Defaults to the deployment \
                block of the --network preset, or 0",
        display_order = 0
    )]
    pub deployment_block: Option<u64>,

    #[clap(
        long,
        value_name = "BLOCKS",
        default_value_t = 10_000,
        help = "Number of blocks requested per log query while scanning events",
        display_order = 0
    )]
    pub scan_batch_size: u64,

    #[clap(
        long,
        value_name = "SECONDS",
        help = "Give up waiting for a transaction receipt after this many seconds",
        display_order = 0
    )]
    pub confirmation_timeout: Option<u64>,

    /* Operators and keys */
    #[clap(
        long = "operator",
        env = "OPERATORS",
        value_name = "ID:BASE64_PEM",
        value_delimiter = ',',
        required = true,
        help = "An operator that receives a share of every validator, given as its id and base64 \
                encoded RSA public key. Repeat or separate with commas. At least 4 operators \
                are required",
        display_order = 0
    )]
    pub operators: Vec<String>,

    #[clap(
        long,
        value_name = "COUNT",
        help = "Number of shares needed to reconstruct a validator key. Defaults to the quorum \
                of the operator set",
        display_order = 0
    )]
    pub threshold: Option<usize>,

    #[clap(
        long,
        env = "KEYSTORE_PATH",
        value_name = "DIR",
        help = "Directory of EIP-2335 keystore files, one validator per <name>.json",
        display_order = 0
    )]
    pub keystore_dir: PathBuf,

    #[clap(
        long,
        env = "PASSWORDS_PATH",
        value_name = "DIR",
        help = "Directory holding the password of every keystore as <name>.txt",
        display_order = 0
    )]
    pub password_dir: PathBuf,

    /* Amounts */
    #[clap(
        long,
        value_name = "SSV",
        default_value = "100000000",
        help = "Amount of SSV, in whole tokens, the network contract is allowed to spend",
        display_order = 0
    )]
    pub approval_amount: String,

    #[clap(
        long,
        value_name = "AMOUNT",
        default_value = "1000",
        help = "Amount of SSV, in the smallest token unit, deposited with each registration",
        display_order = 0
    )]
    pub registration_amount: String,

    #[clap(
        long,
        value_enum,
        default_value_t = NoncePolicy::Resync,
        help = "How the owner nonce is handled after a validator fails once its payload was \
                built",
        display_order = 0
    )]
    pub nonce_policy: NoncePolicy,

    /* Output */
    #[clap(
        long,
        value_name = "FILE",
        help = "Write a JSON report of the run to this file",
        display_order = 0
    )]
    pub report_file: Option<PathBuf>,

    #[clap(
        long,
        help = "Exit successfully even if some validators could not be registered",
        display_order = 0
    )]
    pub allow_failures: bool,

    #[clap(
        long,
        value_name = "LEVEL",
        default_value = "info",
        help = "Verbosity of the logs. Overridden by RUST_LOG",
        display_order = 0
    )]
    pub debug_level: String,
}
