//! Serial number (UID) shuffling.
//!
//! A fresh UID keeps the NXP manufacturer byte (`0x04`) and draws the other
//! six bytes uniformly from a CSPRNG. Both check bytes are recomputed. The
//! session is left unsealed; derived keys are re-derived on the next seal
//! because the UID pages feed key derivation.

use amiibo_crypto_core::{NXP_MANUFACTURER_ID, UID_LEN};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::session::Session;

/// Assign a random UID drawn from the operating system RNG.
///
/// Returns the new UID (check bytes stripped).
pub fn randomize(session: &mut Session) -> [u8; UID_LEN] {
    randomize_with(session, &mut OsRng)
}

/// Assign a random UID drawn from `rng`.
pub fn randomize_with<R: RngCore + CryptoRng>(session: &mut Session, rng: &mut R) -> [u8; UID_LEN] {
    let mut uid = [0u8; UID_LEN];
    uid[0] = NXP_MANUFACTURER_ID;
    rng.fill_bytes(&mut uid[1..]);
    session.set_uid(&uid);
    debug!(uid = %session.dump().uid_hex(), "serial shuffled");
    uid
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
