pub mod application;
pub mod approver;
pub mod credit_rule;
pub mod log;
pub mod terms;
