use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::convert::TryFrom;

/// Maximum number of entrant slots in a round (the account is fixed-size)
pub const MAX_PLAYERS: usize = 100;

const HEADER_LEN: usize = 159;
const PLAYERS_REGION_LEN: usize = 4 + MAX_PLAYERS * PUBKEY_BYTES;

/// State of the current round
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// A randomness request is outstanding; entries are rejected
    Selecting,
}

impl TryFrom<u8> for RaffleState {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Selecting),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Selecting => 1,
        }
    }
}

/// Result of the four-condition upkeep predicate. All four must hold
/// before a selection round may begin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpkeepStatus {
    /// At least `interval` seconds have passed since the last selection
    pub interval_elapsed: bool,
    /// The round is open
    pub is_open: bool,
    /// The pot holds a nonzero balance
    pub has_balance: bool,
    /// At least one entrant has joined
    pub has_players: bool,
}

impl UpkeepStatus {
    pub fn needed(&self) -> bool {
        self.interval_elapsed && self.is_open && self.has_balance && self.has_players
    }
}

/// Raffle account data
///
/// A single round record, reset in place after each payout. The
/// `pending_request_id` slot is the randomness correlation table:
/// non-empty exactly while the round is in `Selecting`.
#[derive(Debug, Clone)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Only signer allowed to deliver randomness responses
    pub oracle_authority: Pubkey,
    /// Fee per entry in lamports, fixed at initialization
    pub entrance_fee: u64,
    /// Minimum seconds between selections, fixed at initialization
    pub interval: i64,
    /// Gas limit forwarded to the oracle with each request
    pub callback_gas_limit: u32,
    /// Oracle subscription the requests are billed to
    pub subscription_id: u64,
    /// Oracle gas lane (key hash) used for requests
    pub gas_lane: [u8; 32],
    /// State of the current round
    pub state: RaffleState,
    /// Completion time of the last selection (init time before the first)
    pub last_timestamp: UnixTimestamp,
    /// Outstanding randomness request, if any
    pub pending_request_id: Option<u64>,
    /// Monotonic counter used to correlate requests with responses
    pub next_request_id: u64,
    /// Winner of the most recently completed round
    pub recent_winner: Pubkey,
    /// Accumulated entry value of the current round in lamports
    pub pot_lamports: u64,
    /// Entrants of the current round, insertion order significant,
    /// duplicates allowed (each entry is a separate equal-weight slot)
    pub players: Vec<Pubkey>,
}

impl Raffle {
    /// Evaluate the upkeep predicate at time `now`. Read-only.
    pub fn upkeep_status(&self, now: UnixTimestamp) -> UpkeepStatus {
        UpkeepStatus {
            interval_elapsed: now.saturating_sub(self.last_timestamp) >= self.interval,
            is_open: self.state == RaffleState::Open,
            has_balance: self.pot_lamports > 0,
            has_players: !self.players.is_empty(),
        }
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn num_players(&self) -> u64 {
        self.players.len() as u64
    }

    pub fn recent_winner(&self) -> Pubkey {
        self.recent_winner
    }

    pub fn latest_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize = HEADER_LEN + PLAYERS_REGION_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Raffle::LEN];
        let (header, players_region) = array_refs![src, HEADER_LEN, PLAYERS_REGION_LEN];
        let (
            is_initialized,
            oracle_authority,
            entrance_fee,
            interval,
            callback_gas_limit,
            subscription_id,
            gas_lane,
            state,
            last_timestamp,
            pending_flag,
            pending_id,
            next_request_id,
            recent_winner,
            pot_lamports,
        ) = array_refs![header, 1, 32, 8, 8, 4, 8, 32, 1, 8, 1, 8, 8, 32, 8];

        let state = RaffleState::try_from(state[0])?;
        let pending_request_id = match pending_flag[0] {
            0 => None,
            1 => Some(u64::from_le_bytes(*pending_id)),
            _ => return Err(ProgramError::InvalidAccountData),
        };

        let (count, slots) = array_refs![players_region, 4, MAX_PLAYERS * PUBKEY_BYTES];
        let count = u32::from_le_bytes(*count) as usize;
        if count > MAX_PLAYERS {
            return Err(ProgramError::InvalidAccountData);
        }
        let mut players = Vec::with_capacity(count);
        for slot in slots.chunks_exact(PUBKEY_BYTES).take(count) {
            players.push(Pubkey::new_from_array(*array_ref![slot, 0, PUBKEY_BYTES]));
        }

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            oracle_authority: Pubkey::new_from_array(*oracle_authority),
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: i64::from_le_bytes(*interval),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            subscription_id: u64::from_le_bytes(*subscription_id),
            gas_lane: *gas_lane,
            state,
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            pending_request_id,
            next_request_id: u64::from_le_bytes(*next_request_id),
            recent_winner: Pubkey::new_from_array(*recent_winner),
            pot_lamports: u64::from_le_bytes(*pot_lamports),
            players,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (header, players_region) = mut_array_refs![dst, HEADER_LEN, PLAYERS_REGION_LEN];
        let (
            is_initialized_dst,
            oracle_authority_dst,
            entrance_fee_dst,
            interval_dst,
            callback_gas_limit_dst,
            subscription_id_dst,
            gas_lane_dst,
            state_dst,
            last_timestamp_dst,
            pending_flag_dst,
            pending_id_dst,
            next_request_id_dst,
            recent_winner_dst,
            pot_lamports_dst,
        ) = mut_array_refs![header, 1, 32, 8, 8, 4, 8, 32, 1, 8, 1, 8, 8, 32, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        oracle_authority_dst.copy_from_slice(self.oracle_authority.as_ref());
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        gas_lane_dst.copy_from_slice(&self.gas_lane);
        state_dst[0] = self.state.into();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();
        match self.pending_request_id {
            Some(id) => {
                pending_flag_dst[0] = 1;
                *pending_id_dst = id.to_le_bytes();
            }
            None => {
                pending_flag_dst[0] = 0;
                *pending_id_dst = [0u8; 8];
            }
        }
        *next_request_id_dst = self.next_request_id.to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        *pot_lamports_dst = self.pot_lamports.to_le_bytes();

        let (count_dst, slots_dst) = mut_array_refs![players_region, 4, MAX_PLAYERS * PUBKEY_BYTES];
        *count_dst = (self.players.len() as u32).to_le_bytes();
        for (player, slot) in self
            .players
            .iter()
            .zip(slots_dst.chunks_exact_mut(PUBKEY_BYTES))
        {
            slot.copy_from_slice(player.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_raffle() -> Raffle {
        Raffle {
            is_initialized: true,
            oracle_authority: Pubkey::new_unique(),
            entrance_fee: 10_000_000,
            interval: 30,
            callback_gas_limit: 500_000,
            subscription_id: 1,
            gas_lane: [7u8; 32],
            state: RaffleState::Open,
            last_timestamp: 1_000,
            pending_request_id: None,
            next_request_id: 1,
            recent_winner: Pubkey::default(),
            pot_lamports: 0,
            players: Vec::new(),
        }
    }

    #[test]
    fn state_byte_encoding_is_stable() {
        assert_eq!(u8::from(RaffleState::Open), 0);
        assert_eq!(u8::from(RaffleState::Selecting), 1);
        assert_eq!(RaffleState::try_from(0).unwrap(), RaffleState::Open);
        assert_eq!(RaffleState::try_from(1).unwrap(), RaffleState::Selecting);
        assert!(RaffleState::try_from(2).is_err());
    }

    #[test]
    fn upkeep_needs_all_four_conditions() {
        let mut raffle = open_raffle();
        raffle.players.push(Pubkey::new_unique());
        raffle.pot_lamports = raffle.entrance_fee;

        let ready = raffle.last_timestamp + raffle.interval;
        assert!(raffle.upkeep_status(ready).needed());
        assert!(!raffle.upkeep_status(ready - 1).needed());

        let mut selecting = raffle.clone();
        selecting.state = RaffleState::Selecting;
        let status = selecting.upkeep_status(ready);
        assert!(!status.is_open);
        assert!(!status.needed());

        let mut empty_pot = raffle.clone();
        empty_pot.pot_lamports = 0;
        assert!(!empty_pot.upkeep_status(ready).needed());

        let mut no_players = raffle.clone();
        no_players.players.clear();
        assert!(!no_players.upkeep_status(ready).needed());
    }

    #[test]
    fn pack_unpack_preserves_round_state() {
        let mut raffle = open_raffle();
        raffle.state = RaffleState::Selecting;
        raffle.pending_request_id = Some(42);
        raffle.next_request_id = 43;
        raffle.pot_lamports = 30_000_000;
        raffle.players = vec![
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        // one address entering twice holds two slots
        raffle.players.push(raffle.players[0]);

        let mut buf = vec![0u8; Raffle::LEN];
        raffle.pack_into_slice(&mut buf);
        let decoded = Raffle::unpack_from_slice(&buf).unwrap();

        assert_eq!(decoded.state, RaffleState::Selecting);
        assert_eq!(decoded.pending_request_id, Some(42));
        assert_eq!(decoded.next_request_id, 43);
        assert_eq!(decoded.pot_lamports, 30_000_000);
        assert_eq!(decoded.players, raffle.players);
        assert_eq!(decoded.players[3], decoded.players[0]);
        assert_eq!(decoded.gas_lane, raffle.gas_lane);
    }

    #[test]
    fn unpack_rejects_oversized_player_count() {
        let raffle = open_raffle();
        let mut buf = vec![0u8; Raffle::LEN];
        raffle.pack_into_slice(&mut buf);
        buf[HEADER_LEN..HEADER_LEN + 4]
            .copy_from_slice(&((MAX_PLAYERS as u32) + 1).to_le_bytes());
        assert!(Raffle::unpack_from_slice(&buf).is_err());
    }
}
