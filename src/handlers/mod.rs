/// HTTP handlers: thin adapters from requests to service calls
pub mod commerce;
pub mod common;
pub mod health;
