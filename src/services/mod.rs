//! Services layer - Business logic
//!
//! Services implement the business rules and coordinate between
//! repositories, the session store and the token codec.

pub mod article;
pub mod password;
pub mod token;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use password::{hash_password, verify_password};
pub use token::{Payload, TokenError, TokenMaker};
pub use user::{
    ClientInfo, LoginInput, LoginOutcome, RegisterInput, RenewedAccess, UserService,
    UserServiceError,
};
