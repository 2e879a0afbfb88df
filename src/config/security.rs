use crate::errors::GateError;

const DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "data:",
    "vbscript:",
];

/// Keys whose values become part of file names under the build directory.
const PATH_COMPONENT_KEYS: &[&str] = &["app_name", "app_version"];

pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), GateError> {
    check_value(value, &[])?;
    Ok(())
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), GateError> {
    match value {
        serde_yaml::Value::String(s) => {
            let path_str = if path.is_empty() { "root".to_string() } else { path.join(".") };
            let lower = s.to_lowercase();
            for pattern in DANGEROUS_PATTERNS {
                if lower.contains(pattern) {
                    return Err(GateError::Config(
                        format!("Dangerous pattern '{}' found at config path: {}", pattern, path_str)
                    ));
                }
            }
            let is_path_component = path
                .last()
                .is_some_and(|k| PATH_COMPONENT_KEYS.contains(&k.as_str()));
            if is_path_component && (s.contains("..") || s.contains('/') || s.contains('\\')) {
                return Err(GateError::Config(
                    format!("Path separators are not allowed at config path: {}", path_str)
                ));
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = k.as_str().unwrap_or("unknown").to_string();
                let mut new_path = path.to_vec();
                new_path.push(key);
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut new_path = path.to_vec();
                new_path.push(format!("[{}]", i));
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
