use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "backend": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "format": "uri" },
                    "token": { "type": "string" },
                    "connect_timeout_secs": { "type": "integer", "minimum": 0 },
                    "read_timeout_secs": { "type": "integer", "minimum": 0 },
                    "write_timeout_secs": { "type": "integer", "minimum": 0 },
                    "proxy": {
                        "type": "object",
                        "properties": {
                            "host": { "type": "string" },
                            "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                            "username": { "type": "string" },
                            "password": { "type": "string" }
                        },
                        "required": ["host", "port"]
                    },
                    "issue_template": { "type": "string" },
                    "page_size": { "type": "integer", "minimum": 1 }
                }
            },
            "upload": {
                "type": "object",
                "properties": {
                    "app_name": { "type": "string" },
                    "app_version": { "type": "string" },
                    "results_file": { "type": "string" },
                    "filter_set": { "type": "string" },
                    "failure_condition": { "type": "string" },
                    "timeout_minutes": { "type": "integer", "minimum": 0 },
                    "poll_interval_minutes": { "type": "integer", "minimum": 0 }
                }
            },
            "storage": {
                "type": "object",
                "properties": {
                    "builds_dir": { "type": "string" }
                }
            },
            "scoring": {
                "type": "object",
                "properties": {
                    "status_grouping": { "type": "string" },
                    "class_grouping": { "type": "string" }
                }
            }
        },
        "additionalProperties": false
    })
});
