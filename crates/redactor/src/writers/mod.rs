//! Writer adapters: the redaction boundary between detected spans/boxes and
//! the output document format.

mod docx;
mod image;
mod pdf;

pub use docx::redact_docx;
pub use image::redact_image;
pub use pdf::redact_pdf;
