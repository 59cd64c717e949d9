use cggmp_threshold_ecdsa::curv::arithmetic::Converter;
use cggmp_threshold_ecdsa::curv::elliptic::curves::Point;
use cggmp_threshold_ecdsa::curv::BigInt;
use cggmp_threshold_ecdsa::gg_2020::party_i::{verify, SignatureRecid};
use cggmp_threshold_ecdsa::gg_2020::state_machine::sign::{
    PartialSignature, SignManual,
};
use round_based::Msg;
use serde::{Deserialize, Serialize};

use super::keccak_address;
use crate::gg20::presign::OfflineResult;
use crate::{Error, ProtocolDriver, Result, RoundMsg};

type Secp256k1 = cggmp_threshold_ecdsa::curv::elliptic::curves::secp256_k1::Secp256k1;

/// A completed, verified threshold ECDSA signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// The recoverable ECDSA signature.
    pub signature: SignatureRecid,
    /// Uncompressed public key the signature verifies against.
    pub public_key: Vec<u8>,
    /// Keccak-derived address for the public key, for display purposes.
    pub address: String,
}

/// Drives the single signature-share round: every signing participant
/// broadcasts its partial signature, and once `threshold` shares from
/// peers have arrived (`RoundBuffer::new_fixed(1, threshold)`),
/// combines and verifies the final signature.
///
/// This is the terminal step of both the staged (offline-then-online)
/// and the one-round signing paths: the offline path feeds it a
/// [`OfflineResult`] computed over several prior rounds, while
/// one-round signing skips straight to it using pre-shared ephemeral
/// material.
pub struct SignOnlineDriver {
    party_number: u16,
    message: BigInt,
    public_key: Point<Secp256k1>,
    partial: PartialSignature,
    sign: SignManual,
    partials: Vec<PartialSignature>,
}

impl SignOnlineDriver {
    /// Start the signing round for `party_number`, over `message`
    /// (already hashed to a scalar), using the completed offline stage.
    pub fn new(
        party_number: u16,
        completed_offline_stage: OfflineResult,
        message: [u8; 32],
    ) -> Result<Self> {
        let message = BigInt::from_bytes(&message);
        let public_key = completed_offline_stage.public_key().clone();
        let (sign, partial) =
            SignManual::new(message.clone(), completed_offline_stage)
                .map_err(|e| Error::Proceed(e.to_string()))?;
        Ok(Self {
            party_number,
            message,
            public_key,
            sign,
            partial,
            partials: Vec::new(),
        })
    }
}

impl ProtocolDriver for SignOnlineDriver {
    type Error = Error;
    type Incoming = Msg<PartialSignature>;
    type Outgoing = RoundMsg<PartialSignature>;
    type Output = Signature;

    fn handle_incoming(&mut self, message: Self::Incoming) -> Result<()> {
        self.partials.push(message.body);
        Ok(())
    }

    fn proceed(&mut self) -> Result<(u16, Vec<Self::Outgoing>)> {
        let messages = vec![Msg {
            sender: self.party_number,
            receiver: None,
            body: self.partial.clone(),
        }];
        Ok((1, RoundMsg::from_round(1, messages)))
    }

    fn finish(self) -> Result<Self::Output> {
        let signature = self
            .sign
            .clone()
            .complete(&self.partials)
            .map_err(|e| Error::Finish(e.to_string()))?;
        verify(&signature, &self.public_key, &self.message)
            .map_err(|_| Error::VerifySignature)?;

        let public_key = self.public_key.to_bytes(false).to_vec();
        Ok(Signature {
            address: keccak_address(&public_key),
            signature,
            public_key,
        })
    }
}
