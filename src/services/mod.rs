pub mod connectivity;
pub mod queue_store;
pub mod submitter;
pub mod sync;
pub mod validation;
pub mod webhook;
