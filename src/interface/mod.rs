//! # Interface Module
//!
//! This module provides all the available behavior used to interact with
//! the project in different ways, which is currently limited to the command
//! line.

/* INTERFACE IMPLEMENTATIONS */

pub mod cli;
