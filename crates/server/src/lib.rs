pub mod errors;
pub mod request;
pub mod routes;
pub mod startup;

pub use startup::run;
