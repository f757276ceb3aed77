pub mod customer;
pub mod event;
pub mod product;
pub mod recommendation;
pub mod report;
pub mod segment;
