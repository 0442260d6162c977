pub mod company;
pub mod extraction;
pub mod quote;
