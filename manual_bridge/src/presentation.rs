// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Presentation layer
//!
//! The HTTP/WS surface (§6): upload, status polling, progress streaming, an
//! admin surface over the stored corpus, and the health/metrics endpoints
//! operators poll. Every handler maps a request to one application use case
//! or service call and maps the result back to the wire formats in §6 -
//! handlers never touch `AppContext`'s internals directly beyond what the
//! use case functions already expose.

pub mod http;
