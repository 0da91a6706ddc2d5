// ABOUTME: Core types and constants for the pgfixture database-provisioning broker
// ABOUTME: Foundation crate with error handling and engine/default constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # pgfixture core
//!
//! Shared types for the `pgfixture` workspace. Kept separate from the root crate so
//! that error and constant definitions change rarely and compile once.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode` and `ProvisionStep`
//! - **constants**: Engine limits, default coordinates and the pinned extension

/// Unified error handling with standard error codes and provisioning context
pub mod errors;

/// Engine limits and defaults organized by domain
pub mod constants;
