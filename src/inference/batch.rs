//! 表形式入力への推論列の付与。
use thiserror::Error;

use super::prediction::Prediction;
use super::predictor::Predictor;
use crate::acquisition::table::{Table, TableError};
use crate::training::corpus::TEXT_COLUMN;

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const CONFIDENCE_COLUMN: &str = "Confidence (%)";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV file must contain a '{TEXT_COLUMN}' column")]
    MissingTextColumn,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// 推論列を追加した表と、行ごとの結果。
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    pub table: Table,
    pub predictions: Vec<Prediction>,
}

/// `text` 列の各行を分類し、`Prediction` と `Confidence (%)` 列を追加した表を返す。
///
/// 元の列と行順は保持する。空行は `N/A` になる。
///
/// # Errors
/// `text` 列が無い場合。推論は一切行わない。
pub fn classify_table(predictor: &Predictor, table: &Table) -> Result<ClassifiedTable, BatchError> {
    let texts = table
        .column(TEXT_COLUMN)
        .ok_or(BatchError::MissingTextColumn)?;
    let predictions = predictor.predict_batch(&texts);

    let mut augmented = table.clone();
    augmented.append_column(
        PREDICTION_COLUMN,
        predictions
            .iter()
            .map(|p| p.label.as_str().to_string())
            .collect(),
    )?;
    augmented.append_column(
        CONFIDENCE_COLUMN,
        predictions
            .iter()
            .map(|p| format!("{:.2}", p.confidence))
            .collect(),
    )?;
    Ok(ClassifiedTable {
        table: augmented,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::trained_pair;

    #[test]
    fn appends_prediction_columns_in_row_order() {
        let predictor = Predictor::new(Arc::new(trained_pair()), 0);
        let table = Table::from_reader("id,text\n1,NASA telescope orbit\n2,\n3,microchip hoax\n".as_bytes())
            .expect("table");

        let classified = classify_table(&predictor, &table).expect("classify");
        assert_eq!(classified.predictions.len(), 3);
        let augmented = classified.table;
        assert_eq!(
            augmented.headers(),
            ["id", "text", PREDICTION_COLUMN, CONFIDENCE_COLUMN]
        );
        let labels = augmented.column(PREDICTION_COLUMN).expect("labels");
        assert_eq!(labels, ["REAL", "N/A", "FAKE"]);
        let ids = augmented.column("id").expect("ids");
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn missing_text_column_is_rejected_before_inference() {
        let predictor = Predictor::new(Arc::new(trained_pair()), 0);
        let table = Table::from_reader("title,body\nA,B\n".as_bytes()).expect("table");
        assert!(matches!(
            classify_table(&predictor, &table),
            Err(BatchError::MissingTextColumn)
        ));
        assert_eq!(predictor.model_invocations(), 0);
    }
}
