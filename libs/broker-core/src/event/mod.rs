mod codec;
mod model;

pub use codec::{CodecError, Mode, decode_request, detect_mode, encode_batch_request, encode_request};
pub use model::{CloudEvent, ExtensionValue};
