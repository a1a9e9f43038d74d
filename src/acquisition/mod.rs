//! 推論への入力経路: URL、アップロード、定型例。
pub mod article;
pub mod examples;
pub mod table;
pub mod upload;

pub use article::{Article, ArticleFetcher, ArticleSource, FetchError};
pub use examples::ExampleKind;
pub use table::{Table, TableError};
pub use upload::{Upload, UploadError, parse_upload};
