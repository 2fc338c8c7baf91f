pub mod cookies;
pub mod extractors;
pub mod jwt;
pub mod ownership;
pub mod password;
pub mod tokens;

pub use extractors::{Identity, MaybeIdentity};
pub use tokens::{SessionPolicy, TokenPair, TokenService};
