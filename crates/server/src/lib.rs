pub mod errors;
pub mod metrics;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod state;

pub use startup::run;
