//! CSV テーブルの読み書き。
use std::io::Read;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
    #[error("column has {found} values but the table has {expected} rows")]
    ColumnLength { expected: usize, found: usize },
}

/// ヘッダ付きの文字列テーブル。欠けたセルは空文字として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// # Errors
    /// CSV として読めない場合。
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(ToString::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// 列の値を行順に返す。列が無ければ `None`。
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map_or("", String::as_str))
                .collect(),
        )
    }

    /// 末尾に列を追加する。既存の列と行順は変えない。
    ///
    /// # Errors
    /// 値の数が行数と一致しない場合。
    pub fn append_column(&mut self, name: &str, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let width = self.headers.len();
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.resize(width.max(row.len()), String::new());
            row.push(value);
        }
        Ok(())
    }

    /// # Errors
    /// CSV の書き出しに失敗した場合。
    pub fn to_csv(&self) -> Result<String, TableError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|error| TableError::Io(error.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
