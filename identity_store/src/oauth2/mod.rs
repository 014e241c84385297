mod errors;
mod storage;
mod types;

pub use errors::OAuthAccountError;
pub use storage::OAuthAccountStore;
pub use types::{AccountSearchField, NewOAuthAccount, OAuthAccount, TokenUpdate};
