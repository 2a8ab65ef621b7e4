// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Config administration use cases
//!
//! `set` and `rollback` both go through the same path: serialize the live
//! config to JSON, mutate one dotted path, validate the whole tree, then
//! swap the `ArcSwap` snapshot and record a [`ConfigChange`] - so a bad
//! write to one field can never leave `AppConfig` in a state that wouldn't
//! also have passed `AppConfig::validate` on a full reload (§4.13).

use std::sync::Arc;

use manual_bridge_domain::audit::{ActorRole, AuditEvent, EventResult};
use manual_bridge_domain::config::{AppConfig, ConfigChange};
use manual_bridge_domain::error::PipelineError;

use crate::application::commands::{ConfigRollbackCommand, ConfigSetCommand};
use crate::context::AppContext;

fn get_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn set_path(value: &mut serde_json::Value, path: &str, new_value: serde_json::Value) -> Result<(), PipelineError> {
    let mut segments = path.split('.').peekable();
    let mut cursor = value;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            let object = cursor
                .as_object_mut()
                .ok_or_else(|| PipelineError::invalid_config(format!("config path '{path}' does not resolve to an object field")))?;
            object.insert(segment.to_string(), new_value);
            return Ok(());
        }
        cursor = cursor
            .get_mut(segment)
            .ok_or_else(|| PipelineError::invalid_config(format!("unknown config path segment '{segment}' in '{path}'")))?;
    }
    Err(PipelineError::invalid_config("config path must not be empty"))
}

pub fn get_config(app: &AppContext) -> Arc<AppConfig> {
    app.config_snapshot()
}

pub fn get_change_history(app: &AppContext) -> Result<Vec<ConfigChange>, PipelineError> {
    app.config_store.history()
}

pub async fn set_config(app: &AppContext, command: ConfigSetCommand) -> Result<ConfigChange, PipelineError> {
    let current = app.config_snapshot();
    let mut as_json = serde_json::to_value(current.as_ref())?;
    let previous_value = get_path(&as_json, &command.path)
        .cloned()
        .ok_or_else(|| PipelineError::invalid_config(format!("unknown config path '{}'", command.path)))?;

    set_path(&mut as_json, &command.path, command.new_value.clone())?;
    let updated: AppConfig = serde_json::from_value(as_json)?;
    updated.validate()?;

    let change = ConfigChange::new(command.path.clone(), previous_value, command.new_value.clone(), command.actor.clone());
    if !change.is_noop() {
        app.config.store(Arc::new(updated));
        app.config_store.record(&change)?;
    }

    let _ = app.audit_store.append(&AuditEvent::record(
        "config_change",
        &command.actor,
        ActorRole::Admin,
        EventResult::Success,
        serde_json::json!({ "path": command.path, "new_value": command.new_value }),
    ));

    Ok(change)
}

pub async fn rollback_config(app: &AppContext, command: ConfigRollbackCommand) -> Result<ConfigChange, PipelineError> {
    let recorded = app
        .config_store
        .get(&command.change_id)?
        .ok_or_else(|| PipelineError::NotFound(command.change_id.to_string()))?;

    let outcome = set_config(
        app,
        ConfigSetCommand {
            path: recorded.path.clone(),
            new_value: recorded.previous_value.clone(),
            actor: command.actor.clone(),
        },
    )
    .await?;

    let _ = app.audit_store.append(&AuditEvent::record(
        "config_rollback",
        &command.actor,
        ActorRole::Admin,
        EventResult::Success,
        serde_json::json!({ "change_id": command.change_id.to_string(), "path": recorded.path }),
    ));

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_rewrites_a_nested_leaf() {
        let mut value = serde_json::json!({ "processing": { "batch_size": 3 } });
        set_path(&mut value, "processing.batch_size", serde_json::json!(7)).unwrap();
        assert_eq!(value["processing"]["batch_size"], serde_json::json!(7));
    }

    #[test]
    fn get_path_returns_none_for_unknown_segment() {
        let value = serde_json::json!({ "processing": { "batch_size": 3 } });
        assert!(get_path(&value, "processing.nonexistent").is_none());
    }
}
