//! Shopfront Core
//!
//! Core types shared by the Shopfront backend.
//!
//! This crate contains:
//! - Domain types: Core business entities (User, Cart)
//! - DTOs: Request and response bodies of the HTTP API

pub mod domain;
pub mod dto;
