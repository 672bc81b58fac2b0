//! Validation rules for schema fields

/// Value constraints attached to a field.
/// Copy trait for efficient passing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValidationRules {
    pub non_empty: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl ValidationRules {
    /// No constraints
    pub const fn none() -> Self {
        Self {
            non_empty: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
        }
    }

    /// Validate a string value against the rules
    pub fn validate_string(&self, value: &str) -> Result<(), String> {
        if self.non_empty && value.trim().is_empty() {
            return Err("must not be empty".to_string());
        }
        self.validate_length(value.chars().count(), "characters")
    }

    /// Validate a numeric value against min/max rules
    pub fn validate_number(&self, value: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if value < min {
                return Err(format!("must be at least {}", min));
            }
        }

        if let Some(max) = self.max {
            if value > max {
                return Err(format!("must be at most {}", max));
            }
        }

        Ok(())
    }

    /// Validate the item count of an array
    pub fn validate_items(&self, len: usize) -> Result<(), String> {
        if self.non_empty && len == 0 {
            return Err("must not be empty".to_string());
        }
        self.validate_length(len, "items")
    }

    fn validate_length(&self, len: usize, unit: &str) -> Result<(), String> {
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("must contain at least {} {}", min, unit));
            }
        }

        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("must not exceed {} {}", max, unit));
            }
        }

        Ok(())
    }
}
