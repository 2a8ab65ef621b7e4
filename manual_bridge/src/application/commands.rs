// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Input DTOs for the use cases in [`crate::application::use_cases`]. Kept
//! separate from the presentation layer's request structs so a future
//! non-HTTP entry point (a CLI batch command, a gRPC surface) can drive the
//! same use cases without depending on axum extractors.

use manual_bridge_domain::ids::{ChangeId, ProcessId};

pub struct UploadDocumentCommand {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub actor: String,
}

pub struct CancelProcessCommand {
    pub process_id: ProcessId,
    pub actor: String,
}

pub struct DeleteDocumentCommand {
    pub process_id: ProcessId,
    pub actor: String,
}

pub struct ConfigSetCommand {
    pub path: String,
    pub new_value: serde_json::Value,
    pub actor: String,
}

pub struct ConfigRollbackCommand {
    pub change_id: ChangeId,
    pub actor: String,
}
