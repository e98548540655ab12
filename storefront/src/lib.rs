// storefront/src/lib.rs

//! Iduka storefront service: checkout orchestration, order-acceptance policy,
//! order persistence and the notification templater, served over actix-web.

pub mod acceptance;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod notifications;
pub mod services;
pub mod state;
pub mod web;
