use serde::{Deserialize, Serialize};
use crate::models::{
    GroupingValue, ID_BAD_PRACTICE, ID_EXPLOITABLE, ID_RELIABILITY, ID_SUSPICIOUS, NAME_CRITICAL,
    NAME_HIGH, NAME_HOT, NAME_INFO, NAME_LOW, NAME_MEDIUM, NAME_WARNING,
};

/// Severity tier of a folder bucket, current or legacy naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeverityClass {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityClass {
    /// Exact bucket name match; anything else does not contribute.
    pub fn from_bucket_name(name: &str) -> Option<Self> {
        match name {
            NAME_CRITICAL | NAME_HOT => Some(Self::Critical),
            NAME_HIGH | NAME_WARNING => Some(Self::High),
            NAME_MEDIUM => Some(Self::Medium),
            NAME_LOW | NAME_INFO => Some(Self::Low),
            _ => None,
        }
    }
}

/// Exploitability classification of audited issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExploitClass {
    Exploitable,
    Suspicious,
    BadPractice,
    Reliability,
}

impl ExploitClass {
    /// Case-sensitive prefix match; server names may carry suffixes.
    pub fn from_value_name(name: &str) -> Option<Self> {
        if name.starts_with(ID_EXPLOITABLE) {
            Some(Self::Exploitable)
        } else if name.starts_with(ID_SUSPICIOUS) {
            Some(Self::Suspicious)
        } else if name.starts_with(ID_BAD_PRACTICE) {
            Some(Self::BadPractice)
        } else if name.starts_with(ID_RELIABILITY) {
            Some(Self::Reliability)
        } else {
            None
        }
    }
}

/// Issue counts feeding the weighted score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvsInputs {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    /// Reliability Issue
    pub p1: u32,
    /// Bad Practice
    pub p2: u32,
    /// Suspicious
    pub p3: u32,
    /// Exploitable
    pub p_above: u32,
}

impl NvsInputs {
    pub fn add_severity(&mut self, class: SeverityClass, count: u32) {
        let slot = match class {
            SeverityClass::Critical => &mut self.critical,
            SeverityClass::High => &mut self.high,
            SeverityClass::Medium => &mut self.medium,
            SeverityClass::Low => &mut self.low,
        };
        *slot += count;
    }

    pub fn add_class(&mut self, class: ExploitClass, count: u32) {
        let slot = match class {
            ExploitClass::Exploitable => &mut self.p_above,
            ExploitClass::Suspicious => &mut self.p3,
            ExploitClass::BadPractice => &mut self.p2,
            ExploitClass::Reliability => &mut self.p1,
        };
        *slot += count;
    }

    /// Accumulate the exploitability breakdown of the "All" bucket.
    pub fn add_class_values(&mut self, values: &[GroupingValue]) {
        for value in values {
            if let Some(class) = ExploitClass::from_value_name(&value.name) {
                self.add_class(class, value.total_count);
            }
        }
    }

    pub fn merge(&mut self, other: &NvsInputs) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
        self.p1 += other.p1;
        self.p2 += other.p2;
        self.p3 += other.p3;
        self.p_above += other.p_above;
    }

    /// Weighted risk score. Not normalized by lines of code.
    pub fn score(&self) -> f64 {
        let severity = f64::from(self.critical) * 10.0
            + f64::from(self.high) * 5.0
            + f64::from(self.medium)
            + f64::from(self.low) * 0.1;
        let classes = f64::from(self.p1) * 2.0
            + f64::from(self.p2) * 4.0
            + f64::from(self.p3) * 16.0
            + f64::from(self.p_above) * 64.0;
        severity * 0.5 + classes * 0.5
    }
}
