// Sukashi watermark compositing library

pub mod codec;
pub mod color;
pub mod compositor;
pub mod error;
pub mod fonts;
pub mod format;
pub mod geometry;
pub mod params;
pub mod processor;
pub mod stamp;
pub mod tiling;
pub mod validator;

pub use error::{ErrorMask, ProcessError};
pub use fonts::{BlockShaper, FontBook, FontFace, TextShaper};
pub use format::MimeType;
pub use params::{PictureWatermark, ProcessRequest, TextWatermark, WatermarkSpec};
pub use processor::{ProcessOutput, WatermarkProcessor};
