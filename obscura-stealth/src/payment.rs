//! Stealth payment creation (sender side).
//!
//! The sender decodes the recipient's meta-address, performs ECDH with a
//! fresh ephemeral key, and gets back everything needed to pay: the
//! one-time address, the ephemeral public key to publish, and the view
//! tag. The ephemeral secret is dropped before this module returns.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use obscura_core::constants::is_supported_scheme;
use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{Announcement, MetaAddress, StealthAddressDetails};
use obscura_crypto::derive::{compute_shared_secret, derive_eth_address, derive_stealth_public_key};
use obscura_crypto::{compute_view_tag, encode_scalar, public_key_for, random_scalar};

/// Stealth payment: address to send to and announcement to publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthPayment {
    /// Generation result (address, ephemeral key, view tag)
    pub details: StealthAddressDetails,
    /// The announcement to publish alongside the funds transfer
    pub announcement: Announcement,
    /// Metadata about the payment
    pub metadata: PaymentMetadata,
}

/// Metadata about a stealth payment. Informational only; never on-chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Recipient label (e.g. a name from an address book)
    pub recipient: Option<String>,
    /// Payment amount (informational only)
    pub amount: Option<String>,
    /// Payment token (e.g., "ETH", "USDC")
    pub token: Option<String>,
    /// Optional memo (not stored on-chain)
    pub memo: Option<String>,
}

/// Generates a fresh stealth address for the recipient.
///
/// Each call draws a new ephemeral key, so repeated calls for the same
/// meta-address land on unlinkable addresses.
///
/// # Errors
///
/// Fails if the meta-address is structurally invalid, carries an
/// unsupported scheme id, or either of its keys is not a curve point.
pub fn generate_stealth_address(meta_address: &MetaAddress) -> Result<StealthAddressDetails> {
    generate_stealth_address_with_rng(meta_address, &mut OsRng)
}

/// Like [`generate_stealth_address`], with a caller-supplied RNG.
pub fn generate_stealth_address_with_rng<R: RngCore + CryptoRng>(
    meta_address: &MetaAddress,
    rng: &mut R,
) -> Result<StealthAddressDetails> {
    meta_address.validate()?;
    if !is_supported_scheme(meta_address.scheme_id) {
        return Err(ObscuraError::UnsupportedScheme(meta_address.scheme_id));
    }

    let eph_scalar = random_scalar(rng);
    let ephemeral_pk = public_key_for(&eph_scalar)?;

    // eph_sk drops (and zeroizes) at the end of this scope
    let eph_sk = encode_scalar(&eph_scalar);
    let shared = compute_shared_secret(&eph_sk, &meta_address.viewing_pk)?;

    let view_tag = compute_view_tag(&shared);
    let stealth_pk = derive_stealth_public_key(&meta_address.spending_pk, &shared)?;
    let address = derive_eth_address(&stealth_pk)?;

    Ok(StealthAddressDetails {
        address,
        ephemeral_pk,
        view_tag,
        stealth_pk,
    })
}

/// Creates a complete stealth payment: generate address, build announcement.
pub fn create_stealth_payment(meta_address: &MetaAddress) -> Result<StealthPayment> {
    let details = generate_stealth_address(meta_address)?;
    let announcement = Announcement::new(details.address, details.ephemeral_pk, details.view_tag);

    Ok(StealthPayment {
        details,
        announcement,
        metadata: PaymentMetadata::default(),
    })
}

/// Creates a stealth payment carrying metadata.
pub fn create_stealth_payment_with_metadata(
    meta_address: &MetaAddress,
    metadata: PaymentMetadata,
) -> Result<StealthPayment> {
    let mut payment = create_stealth_payment(meta_address)?;
    payment.metadata = metadata;
    Ok(payment)
}

/// Builder for stealth payments with optional fields.
#[derive(Default)]
pub struct StealthPaymentBuilder {
    meta_address: Option<MetaAddress>,
    recipient: Option<String>,
    amount: Option<String>,
    token: Option<String>,
    memo: Option<String>,
    extra_metadata: Option<Vec<u8>>,
}

impl StealthPaymentBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient's meta-address (required).
    pub fn recipient(mut self, meta_address: MetaAddress) -> Self {
        self.meta_address = Some(meta_address);
        self
    }

    /// Sets a recipient label.
    pub fn recipient_label(mut self, name: impl Into<String>) -> Self {
        self.recipient = Some(name.into());
        self
    }

    /// Sets the informational amount.
    pub fn amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    /// Sets the informational token symbol.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets a memo.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Extra announcement metadata appended after the view tag byte.
    pub fn extra_metadata(mut self, bytes: Vec<u8>) -> Self {
        self.extra_metadata = Some(bytes);
        self
    }

    /// Builds the payment.
    pub fn build(self) -> Result<StealthPayment> {
        let meta_address = self.meta_address.ok_or_else(|| {
            ObscuraError::ValidationError("recipient meta-address is required".into())
        })?;

        let details = generate_stealth_address(&meta_address)?;
        let announcement = match &self.extra_metadata {
            Some(extra) => Announcement::with_metadata(
                details.address,
                details.ephemeral_pk,
                details.view_tag,
                extra,
            ),
            None => Announcement::new(details.address, details.ephemeral_pk, details.view_tag),
        };

        let metadata = PaymentMetadata {
            recipient: self.recipient,
            amount: self.amount,
            token: self.token,
            memo: self.memo,
        };

        Ok(StealthPayment {
            details,
            announcement,
            metadata,
        })
    }
}

/// Checks that a payment's announcement is internally consistent.
pub fn verify_payment(payment: &StealthPayment) -> Result<bool> {
    payment.announcement.validate()?;

    if payment.announcement.stealth_address != payment.details.address {
        return Ok(false);
    }
    if payment.announcement.ephemeral_pk != payment.details.ephemeral_pk {
        return Ok(false);
    }
    Ok(payment.announcement.view_tag() == Some(payment.details.view_tag))
}
