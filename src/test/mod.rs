mod compare;
mod gate;
mod routes;
mod sandbox;
pub mod utils;
