//! Social-aid desk
//!
//! This library provides the offline scan queue and its sync agent, plus the
//! validation and mapping layer used to move beneficiary, member, donation and
//! related records between the hosted database and the desk UI.

pub mod app_state;
pub mod clock;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
