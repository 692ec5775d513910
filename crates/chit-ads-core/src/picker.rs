//! Selection strategies for the single-advertiser path.

use rand_core::{OsRng, RngCore};

/// Chooses one of `count` fixed options, returning its index.
///
/// Implementations must return a value in `0..count` whenever `count > 0`.
pub trait BrandPicker: Send {
  fn pick(&mut self, count: usize) -> usize;
}

/// Uniform choice driven by any [`RngCore`].
#[derive(Debug, Clone)]
pub struct UniformPicker<R> {
  rng: R,
}

impl<R: RngCore> UniformPicker<R> {
  pub fn new(rng: R) -> Self { Self { rng } }
}

impl UniformPicker<OsRng> {
  /// Picker backed by the operating system's entropy source.
  pub fn from_os() -> Self { Self::new(OsRng) }
}

impl<R: RngCore + Send> BrandPicker for UniformPicker<R> {
  fn pick(&mut self, count: usize) -> usize {
    if count <= 1 {
      return 0;
    }
    // Rejection sampling keeps the choice exactly uniform.
    let count = count as u64;
    let zone = u64::MAX - (u64::MAX % count);
    loop {
      let v = self.rng.next_u64();
      if v < zone {
        return (v % count) as usize;
      }
    }
  }
}
