pub mod authz;
pub mod groups;
pub mod health;
pub mod scopes;
pub mod users;
