pub mod project;
pub mod rfq;
pub mod vendor;
