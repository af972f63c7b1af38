mod bitmap;
mod decode;
mod encode;
mod error;
mod framing;
mod schema;

pub use bitmap::Bitmap;
pub use decode::decode;
pub use encode::encode;
pub use error::{EncodeError, FieldError, ParseError, ParseProgress, Section};
pub use framing::{FramingConfig, LengthEncoding};
pub use schema::{FieldKind, FieldSpec, FieldType, PadSide, PadSpec, Schema};
