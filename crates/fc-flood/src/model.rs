//! Versioned flood model and the registry holding the active version.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::cell::FloodCellParameters;
use crate::error::{FloodError, FloodResult};
use crate::regression::RegressionForm;

/// A complete set of cell parameters, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodModel {
    version: String,
    form: RegressionForm,
    cells: Vec<FloodCellParameters>,
}

impl FloodModel {
    pub fn new(
        version: impl Into<String>,
        form: RegressionForm,
        cells: Vec<FloodCellParameters>,
    ) -> FloodResult<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(FloodError::invalid("model version name is empty"));
        }
        if cells.is_empty() {
            return Err(FloodError::invalid(format!(
                "model {version} has no cell parameters"
            )));
        }
        let mut seen = HashSet::with_capacity(cells.len());
        for cell in &cells {
            cell.validate()?;
            if !seen.insert(cell.id) {
                return Err(FloodError::InvalidCell {
                    cell: cell.id,
                    what: "duplicate cell id".to_string(),
                });
            }
        }
        Ok(Self {
            version,
            form,
            cells,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn form(&self) -> RegressionForm {
        self.form
    }

    pub fn cells(&self) -> &[FloodCellParameters] {
        &self.cells
    }

    /// Smallest `min_q` across cells, if every cell has one.
    pub fn common_min_q(&self) -> Option<f64> {
        self.cells
            .iter()
            .map(|c| c.min_q)
            .try_fold(f64::INFINITY, |acc, q| q.map(|q| acc.min(q)))
    }
}

/// Holds the active model. Readers keep the `Arc` they were handed, so an
/// older version lives until its last run finishes.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<FloodModel>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `model` current and return the version it replaced.
    pub fn activate(&self, model: FloodModel) -> Option<Arc<FloodModel>> {
        info!(version = model.version(), cells = model.cells().len(), "activating flood model");
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        slot.replace(Arc::new(model))
    }

    pub fn current(&self) -> Option<Arc<FloodModel>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::CellId;

    fn cell(i: u32, min_q: Option<f64>) -> FloodCellParameters {
        FloodCellParameters {
            id: CellId::from_index(i),
            x: i as f64,
            y: 0.0,
            size: 1.0,
            betas: vec![0.0, 1.0],
            min_q,
        }
    }

    #[test]
    fn registry_swaps_versions() {
        let registry = ModelRegistry::new();
        assert!(registry.current().is_none());

        let v1 = FloodModel::new("v1", RegressionForm::Polynomial, vec![cell(0, None)]).unwrap();
        assert!(registry.activate(v1).is_none());
        let held = registry.current().unwrap();

        let v2 = FloodModel::new("v2", RegressionForm::Polynomial, vec![cell(0, None)]).unwrap();
        let previous = registry.activate(v2).unwrap();
        assert_eq!(previous.version(), "v1");
        assert_eq!(held.version(), "v1");
        assert_eq!(registry.current().unwrap().version(), "v2");
    }

    #[test]
    fn duplicate_cells_are_rejected() {
        let err = FloodModel::new("v1", RegressionForm::Polynomial, vec![cell(3, None), cell(3, None)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(FloodModel::new("v1", RegressionForm::Polynomial, vec![]).is_err());
    }

    #[test]
    fn common_min_q_needs_every_cell() {
        let all = FloodModel::new(
            "v1",
            RegressionForm::Polynomial,
            vec![cell(0, Some(4.0)), cell(1, Some(2.5))],
        )
        .unwrap();
        assert_eq!(all.common_min_q(), Some(2.5));

        let partial = FloodModel::new(
            "v1",
            RegressionForm::Polynomial,
            vec![cell(0, Some(4.0)), cell(1, None)],
        )
        .unwrap();
        assert_eq!(partial.common_min_q(), None);
    }
}
