//! Protocol constants

use std::ops::RangeInclusive;

/// Maximum accepted WebSocket payload (64 KiB)
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Session code alphabet: A-Z and 2-9 minus the lookalikes I, O, 0, 1
pub const SESSION_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Session code length
pub const SESSION_CODE_LENGTH: usize = 6;

/// Player token entropy in bytes (128 bits, hex-encoded on the wire)
pub const PLAYER_TOKEN_BYTES: usize = 16;

/// Allowed session time limit in seconds
pub const TIME_LIMIT_SECONDS: RangeInclusive<u32> = 300..=3600;

/// Allowed player cap per session
pub const MAX_PLAYERS: RangeInclusive<usize> = 5..=100;

/// Display name length in Unicode code points, after NFC and trim
pub const NAME_LENGTH: RangeInclusive<usize> = 2..=50;

/// Number of answer options per question
pub const OPTION_COUNT: usize = 4;

/// Seconds a player has to answer an issued question
pub const ANSWER_TIMEOUT_SECONDS: u64 = 120;

/// Server ping cadence
pub const HEARTBEAT_INTERVAL_SECONDS: u64 = 20;

/// Connection considered dead after this long without any inbound frame
pub const HEARTBEAT_TIMEOUT_SECONDS: u64 = 45;

/// A socket must send `init` within this many seconds of opening
pub const INIT_DEADLINE_SECONDS: u64 = 5;

/// Bounded outbound queue per connection
pub const OUTBOUND_QUEUE_SIZE: usize = 256;

/// Ended sessions are reaped after this grace period
pub const REAP_GRACE_SECONDS: u64 = 60;

/// Maximum comeback credits a player can hold
pub const MAX_COMEBACK_CREDITS: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_alphabet_has_no_lookalikes() {
        for banned in [b'I', b'O', b'0', b'1'] {
            assert!(!SESSION_CODE_ALPHABET.contains(&banned));
        }
        assert_eq!(SESSION_CODE_ALPHABET.len(), 32);
    }
}
