pub mod action;
pub mod context;
pub mod message;
pub mod response;
