pub mod pricing;
pub mod traces;
