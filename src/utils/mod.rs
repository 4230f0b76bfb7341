pub mod email_filter;
