pub mod employee;
pub mod leave_request;
pub mod stream;
