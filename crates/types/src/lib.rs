pub mod amount;
pub mod request;
pub mod route;
pub mod token;

pub use amount::*;
pub use request::*;
pub use route::*;
pub use token::*;
