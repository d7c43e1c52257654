mod bc1;
mod bc7;

pub use bc1::decompress_bc1_block;
pub use bc7::decompress_bc7_block;
