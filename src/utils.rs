use solana_program::account_info::AccountInfo;

use crate::error::RaffleError;

/// Derive the winning entrant index from a randomness response.
///
/// The first 8 bytes of the random value are taken as a little-endian
/// u64 and reduced modulo the entrant count.
pub fn winner_index(randomness: &[u8; 32], num_players: u64) -> u64 {
    debug_assert!(num_players > 0);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&randomness[..8]);
    u64::from_le_bytes(bytes) % num_players
}

/// Move the pot from the program-owned raffle account to the winner.
///
/// Both sides use checked arithmetic; any failure surfaces as
/// `TransferFailed` so the caller aborts without resetting the round.
pub fn transfer_pot(
    raffle_info: &AccountInfo,
    winner_info: &AccountInfo,
    amount: u64,
) -> Result<(), RaffleError> {
    let new_raffle_balance = raffle_info
        .lamports()
        .checked_sub(amount)
        .ok_or(RaffleError::TransferFailed)?;
    let new_winner_balance = winner_info
        .lamports()
        .checked_add(amount)
        .ok_or(RaffleError::TransferFailed)?;

    **raffle_info.try_borrow_mut_lamports()
        .map_err(|_| RaffleError::TransferFailed)? = new_raffle_balance;
    **winner_info.try_borrow_mut_lamports()
        .map_err(|_| RaffleError::TransferFailed)? = new_winner_balance;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_index_reduces_modulo_entrant_count() {
        let mut randomness = [0u8; 32];
        randomness[..8].copy_from_slice(&6u64.to_le_bytes());
        // 6 mod 4 == 2: third entrant wins
        assert_eq!(winner_index(&randomness, 4), 2);
        assert_eq!(winner_index(&randomness, 1), 0);
        assert_eq!(winner_index(&randomness, 6), 0);
    }

    #[test]
    fn winner_index_uses_only_leading_bytes() {
        let mut a = [0u8; 32];
        let mut b = [0xFF; 32];
        a[..8].copy_from_slice(&5u64.to_le_bytes());
        b[..8].copy_from_slice(&5u64.to_le_bytes());
        assert_eq!(winner_index(&a, 3), winner_index(&b, 3));
    }
}
