//! secp256k1 point and scalar plumbing.
//!
//! Conversions between the wire types in `obscura-core` (opaque byte
//! containers) and `k256` arithmetic types. All curve-membership and
//! range checks happen here; the rest of the crate works with valid
//! points and scalars only.

use k256::elliptic_curve::group::Group;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{FieldBytes, ProjectivePoint, Scalar, U256};
use rand::{CryptoRng, RngCore};

use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{CurvePublicKey, SecretScalar};

// ═══════════════════════════════════════════════════════════════════════════════
// POINT CODEC
// ═══════════════════════════════════════════════════════════════════════════════

/// Decodes a compressed SEC1 public key into a curve point.
///
/// Rejects off-curve encodings and the identity. This is the single
/// place where untrusted key bytes become trusted points.
pub fn decode_public_key(pk: &CurvePublicKey) -> Result<ProjectivePoint> {
    let key = k256::PublicKey::from_sec1_bytes(pk.as_bytes())
        .map_err(|_| ObscuraError::InvalidPublicKey(format!("not on curve: {:?}", pk)))?;
    Ok(key.to_projective())
}

/// Encodes a curve point as a compressed SEC1 public key.
pub fn encode_point(point: &ProjectivePoint) -> Result<CurvePublicKey> {
    if bool::from(point.is_identity()) {
        return Err(ObscuraError::InvalidPublicKey(
            "point at infinity has no SEC1 encoding".into(),
        ));
    }

    let encoded = point.to_affine().to_encoded_point(true);
    CurvePublicKey::from_bytes(encoded.as_bytes())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCALAR CODEC
// ═══════════════════════════════════════════════════════════════════════════════

/// Decodes a stored secret scalar, rejecting zero and out-of-range values.
pub fn decode_secret_scalar(secret: &SecretScalar) -> Result<Scalar> {
    let repr: FieldBytes = secret.to_bytes().into();
    let scalar = Option::<Scalar>::from(Scalar::from_repr(repr)).ok_or_else(|| {
        ObscuraError::ValidationError("secret scalar is not in canonical range".into())
    })?;

    if bool::from(scalar.is_zero()) {
        return Err(ObscuraError::ValidationError(
            "secret scalar is zero".into(),
        ));
    }

    Ok(scalar)
}

/// Encodes a scalar as a wire secret.
pub fn encode_scalar(scalar: &Scalar) -> SecretScalar {
    SecretScalar::from_array(scalar.to_bytes().into())
}

/// Maps a 32-byte hash output onto the scalar field by modular reduction.
///
/// The reduction bias is negligible (the group order is within 2^-128 of
/// 2^256).
pub fn scalar_from_hash(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(digest))
}

/// Samples a uniformly random non-zero scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let mut buf = [0u8; 32];
        rng.fill_bytes(&mut buf);
        let scalar = scalar_from_hash(&buf);
        if !bool::from(scalar.is_zero()) {
            return scalar;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY ARITHMETIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes the compressed public key for a secret scalar.
pub fn public_key_for(scalar: &Scalar) -> Result<CurvePublicKey> {
    if bool::from(scalar.is_zero()) {
        return Err(ObscuraError::ValidationError(
            "cannot derive public key for zero scalar".into(),
        ));
    }
    encode_point(&(ProjectivePoint::GENERATOR * scalar))
}
