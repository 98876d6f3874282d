pub mod listing;
pub mod web;
pub mod webhook;
