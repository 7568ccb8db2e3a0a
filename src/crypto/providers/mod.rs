//! Concrete `CryptoProvider` backends.
//!
//! | Provider | Algorithms | Status |
//! |----------|-----------|--------|
//! | [`rustcrypto`] | ML-KEM (512/768/1024), ML-DSA (44/65/87) | Production |
//! | [`stub`] | Same ids, correctly sized, no security | Explicit opt-in only |

pub mod rustcrypto;
pub mod stub;
