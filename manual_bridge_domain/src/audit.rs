// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audit logging (C13)
//!
//! Append-only, sanitized event records plus the risk-score computation.
//! Storage (`data/audit/events.db`) is an infrastructure concern; this
//! module owns the sanitizer and the scoring rule.

use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::ids::AuditEventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Operator,
    Service,
    Anonymous,
}

impl ActorRole {
    fn risk_modifier(self) -> f64 {
        match self {
            ActorRole::Admin => 0.0,
            ActorRole::Operator => 0.5,
            ActorRole::Service => 1.0,
            ActorRole::Anonymous => 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    Success,
    Denied,
    Error,
}

impl EventResult {
    fn risk_modifier(self) -> f64 {
        match self {
            EventResult::Success => 0.0,
            EventResult::Error => 1.0,
            EventResult::Denied => 2.0,
        }
    }
}

/// Base risk by event kind (a representative set; unmapped kinds default to
/// a mid-range base of 2.0).
fn event_kind_base(event_kind: &str) -> f64 {
    match event_kind {
        "config_change" => 3.0,
        "config_rollback" => 3.5,
        "upload" => 1.0,
        "document_delete" => 4.0,
        "auth_failure" => 4.5,
        "recovery_action" => 2.5,
        "degradation_mode_change" => 2.0,
        _ => 2.0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub event_kind: String,
    pub actor: String,
    pub actor_role: ActorRole,
    pub result: EventResult,
    pub payload: serde_json::Value,
    pub risk_score: f64,
    pub at: DateTime<Utc>,
}

struct SensitivePatterns {
    email: Regex,
    phone: Regex,
    credit_card: Regex,
    ssn: Regex,
    api_key: Regex,
    unix_path: Regex,
    non_loopback_ip: Regex,
}

static PATTERNS: OnceLock<SensitivePatterns> = OnceLock::new();

fn patterns() -> &'static SensitivePatterns {
    PATTERNS.get_or_init(|| SensitivePatterns {
        email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
        phone: Regex::new(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap(),
        credit_card: Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap(),
        ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
        api_key: Regex::new(r"\b(?:sk|pk|key|token)[-_][A-Za-z0-9]{16,}\b").unwrap(),
        unix_path: Regex::new(r"(?:/[A-Za-z0-9_.\-]+){2,}").unwrap(),
        non_loopback_ip: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
    })
}

fn is_loopback(ip: &str) -> bool {
    ip.starts_with("127.") || ip == "0.0.0.0"
}

/// Redacts every sensitive pattern in `text` with `[REDACTED]`, per §4.13 and
/// universal invariant #9.
pub fn sanitize(text: &str) -> String {
    let p = patterns();
    let mut out = p.email.replace_all(text, "[REDACTED]").into_owned();
    out = p.ssn.replace_all(&out, "[REDACTED]").into_owned();
    out = p.api_key.replace_all(&out, "[REDACTED]").into_owned();
    out = p.phone.replace_all(&out, "[REDACTED]").into_owned();
    out = p
        .non_loopback_ip
        .replace_all(&out, |caps: &regex::Captures| {
            let ip = &caps[0];
            if is_loopback(ip) {
                ip.to_string()
            } else {
                "[REDACTED]".to_string()
            }
        })
        .into_owned();
    out = p.unix_path.replace_all(&out, "[REDACTED]").into_owned();
    out = p.credit_card.replace_all(&out, "[REDACTED]").into_owned();
    out
}

pub fn contains_sensitive_pattern(text: &str) -> bool {
    sanitize(text) != text
}

/// Recursively sanitizes every string leaf of a JSON value, including object
/// values and array elements. Object keys and non-string scalars pass
/// through unchanged.
fn sanitize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(sanitize(s)),
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sanitize_value).collect()),
        serde_json::Value::Object(map) => {
            serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), sanitize_value(v))).collect())
        }
        other => other.clone(),
    }
}

/// Off-hours bump window: 22:00-06:00 local, treated as UTC here since the
/// deployment's canonical clock is UTC throughout this codebase.
fn is_off_hours(at: DateTime<Utc>) -> bool {
    let hour = at.hour();
    !(6..22).contains(&hour)
}

impl AuditEvent {
    pub fn record(event_kind: impl Into<String>, actor: impl Into<String>, actor_role: ActorRole, result: EventResult, payload: serde_json::Value) -> Self {
        let event_kind = event_kind.into();
        let sanitized_payload = sanitize_value(&payload);
        let at = Utc::now();
        let mut score = event_kind_base(&event_kind) + actor_role.risk_modifier() + result.risk_modifier();
        if contains_sensitive_pattern(&payload.to_string()) {
            score += 1.5;
        }
        if is_off_hours(at) {
            score += 0.5;
        }
        Self {
            id: AuditEventId::new(),
            event_kind,
            actor: actor.into(),
            actor_role,
            result,
            payload: sanitized_payload,
            risk_score: score.clamp(0.0, 10.0),
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_ssn_are_redacted() {
        let out = sanitize("contact jane.doe@example.com, ssn 123-45-6789");
        assert!(!out.contains("jane.doe@example.com"));
        assert!(!out.contains("123-45-6789"));
    }

    #[test]
    fn loopback_ip_survives_sanitization() {
        let out = sanitize("connect to 127.0.0.1 now");
        assert!(out.contains("127.0.0.1"));
    }

    #[test]
    fn non_loopback_ip_is_redacted() {
        let out = sanitize("connect to 10.0.0.5 now");
        assert!(!out.contains("10.0.0.5"));
    }

    #[test]
    fn denied_result_raises_risk_above_success() {
        let success = AuditEvent::record("config_change", "admin", ActorRole::Admin, EventResult::Success, serde_json::json!({}));
        let denied = AuditEvent::record("config_change", "admin", ActorRole::Admin, EventResult::Denied, serde_json::json!({}));
        assert!(denied.risk_score > success.risk_score);
    }

    #[test]
    fn anonymous_actor_raises_risk_over_admin() {
        let admin = AuditEvent::record("upload", "a", ActorRole::Admin, EventResult::Success, serde_json::json!({}));
        let anon = AuditEvent::record("upload", "a", ActorRole::Anonymous, EventResult::Success, serde_json::json!({}));
        assert!(anon.risk_score > admin.risk_score);
    }

    #[test]
    fn risk_score_is_clamped_to_ten() {
        let event = AuditEvent::record("document_delete", "x", ActorRole::Anonymous, EventResult::Denied, serde_json::json!("contains sk-abcdefghijklmnopqrstuvwxyz"));
        assert!(event.risk_score <= 10.0);
    }

    #[test]
    fn object_payload_fields_are_sanitized() {
        let event = AuditEvent::record(
            "config_change",
            "admin",
            ActorRole::Admin,
            EventResult::Success,
            serde_json::json!({
                "actor_email": "jane.doe@example.com",
                "notes": ["reach me at 555-123-4567", "unrelated"],
                "attempt": 3,
            }),
        );
        let serialized = event.payload.to_string();
        assert!(!serialized.contains("jane.doe@example.com"));
        assert!(!serialized.contains("555-123-4567"));
        assert_eq!(event.payload["attempt"], 3);
    }
}
