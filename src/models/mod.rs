pub mod extraction;
pub mod image;

pub use extraction::{
    export_file_name, BatchReport, ExtractionRecord, ExtractionRequest, FieldList,
    SpreadsheetDocument,
};
pub use image::{extension_for, resolve_mime_type, ImageCtx, UploadedImage};
