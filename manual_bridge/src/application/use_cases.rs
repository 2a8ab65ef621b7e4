// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One module per use case family: upload/ingest, process lifecycle
//! management, and config administration. Each function takes an
//! [`crate::context::AppContext`] and a command from
//! [`crate::application::commands`] and returns a plain `Result`, so the
//! presentation layer only has to map to and from HTTP.

pub mod config_admin;
pub mod manage_process;
pub mod process_document;
