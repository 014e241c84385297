mod errors;
mod storage;
mod types;

pub use errors::UserError;
pub use storage::UserStore;
pub use types::{BusinessGoal, CompanySize, SignupData, User, UserRole, UserUpdate};
