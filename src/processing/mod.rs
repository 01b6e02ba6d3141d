mod codec;
mod quality;
mod scheduler;
mod transform;

pub use codec::{Codec, CodecParams, CodecSet, JpegCodec, LosslessPngCodec, LossyPngCodec};
pub use quality::{MAX_QUALITY, MIN_QUALITY, map_quality};
pub use scheduler::BatchScheduler;
pub use transform::{TransformedImage, apply as apply_transform};
