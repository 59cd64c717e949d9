/// Wire round-tag constants for key generation, exactly as produced by
/// the GG20 state machine and matched against in round advancing.
pub mod keygen {
    /// Round 1 broadcast: commitments.
    pub const ROUND_1: &str = "KGRound1Message";
    /// Round 2, first of two messages: VSS shares.
    pub const ROUND_2_MSG_1: &str = "KGRound2Message1";
    /// Round 2, second of two messages: proofs.
    pub const ROUND_2_MSG_2: &str = "KGRound2Message2";
    /// Round 3 broadcast: final confirmation.
    pub const ROUND_3: &str = "KGRound3Message";

    /// Prefix shared by round 1's messages.
    pub const ROUND_1_PREFIX: &str = "KGRound1";
    /// Prefix shared by round 2's messages (both `_MSG_1` and `_MSG_2`).
    pub const ROUND_2_PREFIX: &str = "KGRound2";
    /// Prefix shared by round 3's messages.
    pub const ROUND_3_PREFIX: &str = "KGRound3";

    /// Ordered round prefixes and how many messages-per-peer each
    /// round expects: round 2 carries two distinct wire messages per
    /// peer (`_MSG_1` and `_MSG_2`), every other round carries one.
    pub const ROUND_PREFIXES: &[(&str, u16)] = &[
        (ROUND_1_PREFIX, 1),
        (ROUND_2_PREFIX, 2),
        (ROUND_3_PREFIX, 1),
    ];
}

/// Wire round-tag constants for threshold signing's offline
/// (pre-signing) stage.
pub mod keysign {
    /// Round 1, first of two messages.
    pub const ROUND_1_MSG_1: &str = "SignRound1Message1";
    /// Round 1, second of two messages.
    pub const ROUND_1_MSG_2: &str = "SignRound1Message2";
    /// Round 2.
    pub const ROUND_2: &str = "SignRound2Message";
    /// Round 3.
    pub const ROUND_3: &str = "SignRound3Message";
    /// Round 4.
    pub const ROUND_4: &str = "SignRound4Message";
    /// Round 5.
    pub const ROUND_5: &str = "SignRound5Message";
    /// Round 6.
    pub const ROUND_6: &str = "SignRound6Message";
    /// Round 7.
    pub const ROUND_7: &str = "SignRound7Message";

    /// Prefix shared by round 1's two messages.
    pub const ROUND_1_PREFIX: &str = "SignRound1Message";

    /// Ordered round prefixes and messages-per-peer, for the offline
    /// stage's round-advancer. Round 1 carries two distinct wire
    /// messages per peer.
    pub const ROUND_PREFIXES: &[(&str, u16)] = &[
        (ROUND_1_PREFIX, 2),
        (ROUND_2, 1),
        (ROUND_3, 1),
        (ROUND_4, 1),
        (ROUND_5, 1),
        (ROUND_6, 1),
        (ROUND_7, 1),
    ];
}
