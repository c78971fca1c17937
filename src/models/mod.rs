pub mod rbac;
pub mod scope;
pub mod user;
