use std::collections::HashMap;

use super::model::CellValue;

// ---------------------------------------------------------------------------
// Label encoding: label value → dense integer code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("label {label} at position {position} was not seen when the encoding was fit")]
    UnknownLabel { label: String, position: usize },
}

/// Mapping fit on a label sequence; codes follow first-occurrence order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelEncoding {
    classes: Vec<CellValue>,
    codes: HashMap<CellValue, i64>,
}

impl LabelEncoding {
    /// Fit a mapping and encode `labels` with it in one pass.
    pub fn fit(labels: &[CellValue]) -> (Vec<i64>, LabelEncoding) {
        let mut encoding = LabelEncoding::default();
        let codes = labels
            .iter()
            .map(|label| {
                if let Some(&code) = encoding.codes.get(label) {
                    return code;
                }
                let code = encoding.classes.len() as i64;
                encoding.classes.push(label.clone());
                encoding.codes.insert(label.clone(), code);
                code
            })
            .collect();
        (codes, encoding)
    }

    /// Encode `labels` with this mapping; any unseen label is an error.
    pub fn apply(&self, labels: &[CellValue]) -> Result<Vec<i64>, EncodeError> {
        labels
            .iter()
            .enumerate()
            .map(|(position, label)| {
                self.codes
                    .get(label)
                    .copied()
                    .ok_or_else(|| EncodeError::UnknownLabel {
                        label: label.to_string(),
                        position,
                    })
            })
            .collect()
    }

    /// Distinct labels in code order.
    pub fn classes(&self) -> &[CellValue] {
        &self.classes
    }
}
