//! Severity levels for findings

use serde::{Deserialize, Serialize};

/// How serious a finding is; the ordering drives the severity policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Classify a diagnostic message by keyword: "error" wins over "warning"
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("error") {
            Self::High
        } else if lower.contains("warning") {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// High and critical findings interrupt the consumer
    pub fn interrupts(&self) -> bool {
        *self >= Self::High
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Low.to_string(), "low");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" medium ".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_from_message_keywords() {
        assert_eq!(Severity::from_message("E999 SyntaxError: invalid syntax"), Severity::High);
        assert_eq!(Severity::from_message("W291 Warning: trailing whitespace"), Severity::Medium);
        assert_eq!(Severity::from_message("E501 line too long (120 > 100 characters)"), Severity::Low);
    }

    #[test]
    fn test_error_beats_warning() {
        assert_eq!(Severity::from_message("warning promoted to error"), Severity::High);
    }

    #[test]
    fn test_interrupts() {
        assert!(!Severity::Low.interrupts());
        assert!(!Severity::Medium.interrupts());
        assert!(Severity::High.interrupts());
        assert!(Severity::Critical.interrupts());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let parsed: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }
}
