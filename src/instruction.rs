use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize the raffle account. Configuration is immutable afterwards.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The authority paying for and initializing the raffle
    /// 1. `[writable]` The raffle account, pre-created and owned by this program
    /// 2. `[]` The oracle authority allowed to deliver randomness
    Initialize {
        /// Fee per entry in lamports
        entrance_fee: u64,
        /// Minimum seconds between selections
        interval: i64,
        /// Oracle gas lane (key hash) forwarded with requests
        gas_lane: [u8; 32],
        /// Oracle subscription id requests are billed to
        subscription_id: u64,
        /// Gas limit forwarded to the oracle callback
        callback_gas_limit: u32,
    },

    /// Enter the current round by paying the entrance fee.
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player entering the raffle
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    Enter {
        /// Lamports sent with the entry; must cover the entrance fee
        amount: u64,
    },

    /// Read-only upkeep probe for the automation keeper. Logs the four
    /// eligibility sub-conditions; never mutates state and never fails
    /// on an ineligible round.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {},

    /// Begin winner selection: re-checks the upkeep predicate, flips the
    /// round to selecting, and emits a randomness request.
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller (typically the automation keeper)
    /// 1. `[writable]` The raffle account
    PerformUpkeep {},

    /// Deliver the randomness response for an outstanding request and
    /// complete the round.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The configured oracle authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner (must be the entrant selected by the
    ///    randomness)
    FulfillRandomness {
        /// Correlation id of the request being answered
        request_id: u64,
        /// The verifiable random value
        randomness: [u8; 32],
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (gas_lane, rest) = Self::unpack_bytes32(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, _) = Self::unpack_u32(rest)?;
                Self::Initialize {
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    callback_gas_limit,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::Enter { amount }
            }
            2 => Self::CheckUpkeep {},
            3 => Self::PerformUpkeep {},
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (randomness, _) = Self::unpack_bytes32(rest)?;
                Self::FulfillRandomness {
                    request_id,
                    randomness,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match *self {
            Self::Initialize {
                entrance_fee,
                interval,
                ref gas_lane,
                subscription_id,
                callback_gas_limit,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(gas_lane);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
            }
            Self::Enter { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep {} => buf.push(2),
            Self::PerformUpkeep {} => buf.push(3),
            Self::FulfillRandomness {
                request_id,
                ref randomness,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(randomness);
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(i64::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let value = input
            .get(..4)
            .and_then(|slice| slice.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[4..]))
    }

    fn unpack_bytes32(input: &[u8]) -> Result<([u8; 32], &[u8]), ProgramError> {
        let value: [u8; 32] = input
            .get(..32)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[32..]))
    }
}

/// Create an initialize instruction
pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_account: &Pubkey,
    oracle_authority: &Pubkey,
    entrance_fee: u64,
    interval: i64,
    gas_lane: [u8; 32],
    subscription_id: u64,
    callback_gas_limit: u32,
) -> Instruction {
    let data = RaffleInstruction::Initialize {
        entrance_fee,
        interval,
        gas_lane,
        subscription_id,
        callback_gas_limit,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*oracle_authority, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create an enter instruction
pub fn enter(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Instruction {
    let data = RaffleInstruction::Enter { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create a check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle_account: &Pubkey) -> Instruction {
    let data = RaffleInstruction::CheckUpkeep {}.pack();

    let accounts = vec![AccountMeta::new_readonly(*raffle_account, false)];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create a perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
) -> Instruction {
    let data = RaffleInstruction::PerformUpkeep {}.pack();

    let accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*raffle_account, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create a fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    randomness: [u8; 32],
) -> Instruction {
    let data = RaffleInstruction::FulfillRandomness {
        request_id,
        randomness,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*oracle_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_round_trips() {
        let cases = vec![
            RaffleInstruction::Initialize {
                entrance_fee: 10_000_000,
                interval: 30,
                gas_lane: [9u8; 32],
                subscription_id: 7,
                callback_gas_limit: 500_000,
            },
            RaffleInstruction::Enter { amount: 10_000_000 },
            RaffleInstruction::CheckUpkeep {},
            RaffleInstruction::PerformUpkeep {},
            RaffleInstruction::FulfillRandomness {
                request_id: 3,
                randomness: [0xAB; 32],
            },
        ];
        for case in cases {
            let unpacked = RaffleInstruction::unpack(&case.pack()).unwrap();
            assert_eq!(unpacked, case);
        }
    }

    #[test]
    fn unpack_rejects_truncated_data() {
        assert!(RaffleInstruction::unpack(&[]).is_err());
        assert!(RaffleInstruction::unpack(&[1, 0, 0]).is_err());
        assert!(RaffleInstruction::unpack(&[4, 1, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(RaffleInstruction::unpack(&[99]).is_err());
    }
}
