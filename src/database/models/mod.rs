pub mod answer;
pub mod question;
pub mod role;
pub mod user;

pub use answer::*;
pub use question::*;
pub use role::*;
pub use user::*;
