//! アップロードされたファイルの解釈。
use std::path::Path;

use thiserror::Error;

use super::table::{Table, TableError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type '{0}', upload a .txt or .csv file")]
    UnsupportedType(String),
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("text file is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("could not read CSV: {0}")]
    Csv(#[from] TableError),
}

/// 解釈済みのアップロード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upload {
    /// `.txt`: 1 文書。
    Text { file_name: String, text: String },
    /// `.csv`: 複数文書の表。
    Table { file_name: String, table: Table },
}

impl Upload {
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Text { file_name, .. } | Self::Table { file_name, .. } => file_name,
        }
    }
}

/// 拡張子で判定して読み込む。大文字小文字は区別しない。
///
/// # Errors
/// サイズ超過、対象外の拡張子、UTF-8 でない `.txt`、読めない `.csv` の場合。
pub fn parse_upload(file_name: &str, bytes: Vec<u8>, max_bytes: usize) -> Result<Upload, UploadError> {
    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") => Ok(Upload::Text {
            file_name: file_name.to_string(),
            text: String::from_utf8(bytes)?,
        }),
        Some("csv") => Ok(Upload::Table {
            file_name: file_name.to_string(),
            table: Table::from_reader(bytes.as_slice())?,
        }),
        _ => Err(UploadError::UnsupportedType(file_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn text_files_are_decoded() {
        let upload = parse_upload("story.TXT", b"NASA rover".to_vec(), 1024).expect("upload");
        assert_eq!(
            upload,
            Upload::Text {
                file_name: "story.TXT".into(),
                text: "NASA rover".into()
            }
        );
    }

    #[test]
    fn csv_files_become_tables() {
        let upload = parse_upload("batch.csv", b"text\na\nb\n".to_vec(), 1024).expect("upload");
        let Upload::Table { table, .. } = upload else {
            panic!("expected table");
        };
        assert_eq!(table.len(), 2);
    }

    #[rstest]
    #[case("report.pdf")]
    #[case("noextension")]
    #[case("archive.csv.zip")]
    fn other_types_are_rejected(#[case] name: &str) {
        assert!(matches!(
            parse_upload(name, b"x".to_vec(), 1024),
            Err(UploadError::UnsupportedType(_))
        ));
    }

    #[test]
    fn oversized_and_invalid_utf8_are_rejected() {
        assert!(matches!(
            parse_upload("a.txt", vec![b'a'; 11], 10),
            Err(UploadError::TooLarge { size: 11, limit: 10 })
        ));
        assert!(matches!(
            parse_upload("a.txt", vec![0xff, 0xfe], 10),
            Err(UploadError::InvalidUtf8(_))
        ));
    }
}
