// ABOUTME: Structured error types for the broker re-exported from pgfixture-core
// ABOUTME: Provides coded errors with database and step context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pgfixture_core::errors::*;
