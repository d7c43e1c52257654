/// Errors that can occur while decoding a compressed block.
///
/// Compression is infallible: any block of pixel data is a valid input.
/// Decoding can only fail on bit patterns the format reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The block uses a reserved mode bit pattern.
    ///
    /// For BC7 this is a low byte of 0, aka "mode 8". Hardware decoders
    /// return an all-zero block for it; this crate surfaces it instead so
    /// that callers can drop the block.
    ReservedMode,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::ReservedMode => write!(f, "block uses a reserved mode bit pattern"),
        }
    }
}
impl std::error::Error for DecodeError {}
