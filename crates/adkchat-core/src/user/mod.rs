pub mod model;

pub use model::{AuthToken, Credentials, UserAccount};
