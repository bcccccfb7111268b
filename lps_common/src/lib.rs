mod helpers;
mod money;
pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Naira, NairaConversionError, NAIRA_CURRENCY_CODE, NAIRA_CURRENCY_CODE_LOWER};
pub use secret::Secret;
