//! Outreach step catalog.
//!
//! The catalog is fixed when the scheduler is built and is the only source
//! of pacing: each step says how long to wait after the previous one.

use std::time::Duration;

use thiserror::Error;

use dripforge_core::OutreachStep;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("step at position {position} has index {index}; indices must run 0, 1, 2, ...")]
    NonContiguous { position: usize, index: u32 },

    #[error("step {0} has an empty template id")]
    EmptyTemplate(u32),
}

#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    steps: Vec<OutreachStep>,
}

impl StepCatalog {
    pub fn new(steps: Vec<OutreachStep>) -> Result<Self, CatalogError> {
        for (position, step) in steps.iter().enumerate() {
            if step.index as usize != position {
                return Err(CatalogError::NonContiguous {
                    position,
                    index: step.index,
                });
            }
            if step.template_id.trim().is_empty() {
                return Err(CatalogError::EmptyTemplate(step.index));
            }
        }
        Ok(Self { steps })
    }

    /// One step per delay, with template ids `email_step_{index}`.
    pub fn from_delays(delays: &[Duration]) -> Self {
        let steps = delays
            .iter()
            .enumerate()
            .map(|(i, delay)| OutreachStep {
                index: i as u32,
                min_delay_since_previous: *delay,
                template_id: format!("email_step_{i}"),
            })
            .collect();
        Self { steps }
    }

    pub fn ordered_steps(&self) -> &[OutreachStep] {
        &self.steps
    }

    /// `None` once the lead has gone past the last step.
    pub fn step_at(&self, index: u32) -> Option<&OutreachStep> {
        self.steps.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_final(&self, index: u32) -> bool {
        index as usize + 1 == self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_become_ordered_steps() {
        let day = Duration::from_secs(86_400);
        let catalog = StepCatalog::from_delays(&[Duration::ZERO, day, day]);
        let delays: Vec<u64> = catalog
            .ordered_steps()
            .iter()
            .map(|s| s.min_delay_since_previous.as_secs())
            .collect();
        assert_eq!(delays, vec![0, 86_400, 86_400]);
        assert_eq!(catalog.step_at(2).unwrap().template_id, "email_step_2");
        assert!(catalog.step_at(3).is_none());
        assert!(catalog.is_final(2));
        assert!(!catalog.is_final(1));
    }

    #[test]
    fn rejects_gaps_in_indices() {
        let steps = vec![
            OutreachStep {
                index: 0,
                min_delay_since_previous: Duration::ZERO,
                template_id: "intro".into(),
            },
            OutreachStep {
                index: 2,
                min_delay_since_previous: Duration::from_secs(10),
                template_id: "follow_up".into(),
            },
        ];
        assert_eq!(
            StepCatalog::new(steps).unwrap_err(),
            CatalogError::NonContiguous { position: 1, index: 2 }
        );
    }

    #[test]
    fn rejects_blank_template_ids() {
        let steps = vec![OutreachStep {
            index: 0,
            min_delay_since_previous: Duration::ZERO,
            template_id: "  ".into(),
        }];
        assert_eq!(StepCatalog::new(steps).unwrap_err(), CatalogError::EmptyTemplate(0));
    }

    #[test]
    fn empty_catalog_has_no_steps() {
        let catalog = StepCatalog::from_delays(&[]);
        assert!(catalog.is_empty());
        assert!(catalog.step_at(0).is_none());
    }
}
