use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MutationError;

pub type PrizeId = i64;

pub const MAX_LABEL_CHARS: usize = 200;
pub const MAX_ICON_CHARS: usize = 10;

/// One sector of the wheel. `position` is 1-based and dense across all
/// prizes, active or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prize {
    pub id: PrizeId,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub position: i64,
    #[sqlx(rename = "is_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrize {
    pub label: String,
    pub icon: String,
    pub color: String,
    /// Requested slot; appended when absent.
    pub position: Option<i64>,
    pub active: bool,
}

impl NewPrize {
    pub fn new(label: impl Into<String>, icon: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: icon.into(),
            color: color.into(),
            position: None,
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), MutationError> {
        validate_label(&self.label)?;
        validate_icon(&self.icon)?;
        validate_color(&self.color)?;
        if let Some(pos) = self.position {
            if pos < 1 {
                return Err(MutationError::Invalid {
                    field: "position",
                    reason: format!("{pos} is not a 1-based position"),
                });
            }
        }
        Ok(())
    }
}

/// Partial edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeUpdate {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

impl PrizeUpdate {
    pub fn validate(&self) -> Result<(), MutationError> {
        if let Some(label) = &self.label {
            validate_label(label)?;
        }
        if let Some(icon) = &self.icon {
            validate_icon(icon)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }

    pub fn apply(self, prize: &Prize) -> Prize {
        Prize {
            id: prize.id,
            label: self.label.unwrap_or_else(|| prize.label.clone()),
            icon: self.icon.unwrap_or_else(|| prize.icon.clone()),
            color: self.color.unwrap_or_else(|| prize.color.clone()),
            position: prize.position,
            active: self.active.unwrap_or(prize.active),
        }
    }
}

pub struct SeedPrize {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

pub const DEFAULT_PRIZES: [SeedPrize; 6] = [
    SeedPrize { label: "3-hour lunch break", icon: "🍽️", color: "#4A90D9" },
    SeedPrize { label: "Day off on your birthday", icon: "🎂", color: "#E8734A" },
    SeedPrize { label: "Finish work 2 hours early", icon: "⏰", color: "#F5C242" },
    SeedPrize { label: "Extra day off", icon: "🌴", color: "#D95B5B" },
    SeedPrize { label: "Start work 2 hours later", icon: "😴", color: "#5BBD8C" },
    SeedPrize { label: "Finish work at 14:00", icon: "🏠", color: "#9B6EC5" },
];

fn validate_label(label: &str) -> Result<(), MutationError> {
    let chars = label.trim().chars().count();
    if chars == 0 || label.chars().count() > MAX_LABEL_CHARS {
        return Err(MutationError::Invalid {
            field: "label",
            reason: format!("must be 1..={MAX_LABEL_CHARS} characters"),
        });
    }
    Ok(())
}

fn validate_icon(icon: &str) -> Result<(), MutationError> {
    let chars = icon.chars().count();
    if chars == 0 || chars > MAX_ICON_CHARS {
        return Err(MutationError::Invalid {
            field: "icon",
            reason: format!("must be 1..={MAX_ICON_CHARS} characters"),
        });
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<(), MutationError> {
    let ok = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !ok {
        return Err(MutationError::Invalid {
            field: "color",
            reason: format!("{color:?} is not #RRGGBB"),
        });
    }
    Ok(())
}

/// `order` must name every id in `existing` exactly once.
pub fn check_permutation(existing: &[PrizeId], order: &[PrizeId]) -> Result<(), MutationError> {
    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if !seen.insert(*id) {
            return Err(MutationError::InvalidPermutation {
                reason: format!("prize {id} listed twice"),
            });
        }
    }
    if let Some(unknown) = order.iter().find(|id| !existing.contains(id)) {
        return Err(MutationError::InvalidPermutation {
            reason: format!("prize {unknown} does not exist"),
        });
    }
    if let Some(missing) = existing.iter().find(|id| !seen.contains(id)) {
        return Err(MutationError::InvalidPermutation {
            reason: format!("prize {missing} is missing"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_accepts_any_order() {
        assert!(check_permutation(&[1, 2, 3], &[3, 1, 2]).is_ok());
    }

    #[test]
    fn permutation_rejects_partial_duplicate_and_unknown() {
        for order in [vec![3, 1], vec![3, 1, 1], vec![3, 1, 2, 9]] {
            assert!(matches!(
                check_permutation(&[1, 2, 3], &order),
                Err(MutationError::InvalidPermutation { .. })
            ));
        }
    }

    #[test]
    fn color_must_be_hex_triplet() {
        assert!(validate_color("#a1B2c3").is_ok());
        assert!(validate_color("a1B2c3").is_err());
        assert!(validate_color("#a1B2c").is_err());
        assert!(validate_color("#g1B2c3").is_err());
    }

    #[test]
    fn blank_label_is_rejected() {
        let prize = NewPrize::new("   ", "🎁", "#ffffff");
        assert!(matches!(
            prize.validate(),
            Err(MutationError::Invalid { field: "label", .. })
        ));
    }

    #[test]
    fn update_keeps_unset_fields() {
        let prize = Prize {
            id: 4,
            label: "Extra day off".into(),
            icon: "🌴".into(),
            color: "#D95B5B".into(),
            position: 4,
            active: true,
        };
        let patched = PrizeUpdate { active: Some(false), ..Default::default() }.apply(&prize);
        assert_eq!(patched.label, prize.label);
        assert_eq!(patched.position, 4);
        assert!(!patched.active);
    }
}
