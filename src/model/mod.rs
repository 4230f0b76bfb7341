pub mod account;
pub mod employee;
pub mod leave_request;
