use crate::error::RaffleError;
use crate::instruction::RaffleInstruction;
use crate::state::{Raffle, RaffleState, MAX_PLAYERS};
use crate::utils;

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction,
    sysvar::Sysvar,
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::Initialize {
                entrance_fee,
                interval,
                gas_lane,
                subscription_id,
                callback_gas_limit,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    accounts,
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    callback_gas_limit,
                    program_id,
                )
            }
            RaffleInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep {} => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomness {
                request_id,
                randomness,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, randomness, program_id)
            }
        }
    }

    /// Write the initial round: open, no entrants, clock started now.
    /// Configuration is immutable after this point.
    fn process_initialize(
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: i64,
        gas_lane: [u8; 32],
        subscription_id: u64,
        callback_gas_limit: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let oracle_authority_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        if raffle_info.data_len() < Raffle::LEN {
            msg!("Raffle account too small, need {} bytes", Raffle::LEN);
            return Err(ProgramError::AccountDataTooSmall);
        }

        let existing = Raffle::unpack_unchecked(&raffle_info.data.borrow())?;
        if existing.is_initialized {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        if entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(ProgramError::InvalidArgument);
        }
        if interval <= 0 {
            msg!("Interval must be greater than zero");
            return Err(ProgramError::InvalidArgument);
        }

        let clock = Clock::get()?;

        let raffle_data = Raffle {
            is_initialized: true,
            oracle_authority: *oracle_authority_info.key,
            entrance_fee,
            interval,
            callback_gas_limit,
            subscription_id,
            gas_lane,
            state: RaffleState::Open,
            last_timestamp: clock.unix_timestamp,
            pending_request_id: None,
            next_request_id: 1,
            recent_winner: Pubkey::default(),
            pot_lamports: 0,
            players: Vec::new(),
        };

        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: fee={} lamports, interval={}s, oracle={}",
            entrance_fee,
            interval,
            oracle_authority_info.key
        );
        Ok(())
    }

    /// Accept an entry into the current round. The full sent amount joins
    /// the pot, held by the raffle account itself.
    fn process_enter(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;

        if amount < raffle_data.entrance_fee {
            msg!(
                "Payment of {} lamports below entrance fee of {}",
                amount,
                raffle_data.entrance_fee
            );
            return Err(RaffleError::InsufficientPayment.into());
        }

        if raffle_data.state != RaffleState::Open {
            msg!("Round is selecting a winner, entries rejected");
            return Err(RaffleError::RoundNotOpen.into());
        }

        if raffle_data.players.len() >= MAX_PLAYERS {
            msg!("Entrant slots exhausted ({})", MAX_PLAYERS);
            return Err(RaffleError::RaffleFull.into());
        }

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle_data.players.push(*player_info.key);
        raffle_data.pot_lamports = raffle_data
            .pot_lamports
            .checked_add(amount)
            .ok_or(ProgramError::InvalidArgument)?;
        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        msg!("Entered: player={}", player_info.key);
        Ok(())
    }

    /// Read-only probe for the automation keeper. Logs the four
    /// eligibility sub-conditions and their conjunction.
    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;
        let clock = Clock::get()?;
        let status = raffle_data.upkeep_status(clock.unix_timestamp);

        msg!(
            "Upkeep: interval_elapsed={} is_open={} has_balance={} has_players={} needed={}",
            status.interval_elapsed,
            status.is_open,
            status.has_balance,
            status.has_players,
            status.needed()
        );
        Ok(())
    }

    /// Begin winner selection. The upkeep predicate is re-evaluated at
    /// commit time so a stale or racing trigger cannot force a
    /// transition after conditions changed; a second concurrent call
    /// fails the is_open sub-condition once the state has flipped.
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;
        let clock = Clock::get()?;
        let status = raffle_data.upkeep_status(clock.unix_timestamp);

        if !status.needed() {
            msg!(
                "Upkeep not needed: interval_elapsed={} is_open={} has_balance={} has_players={}",
                status.interval_elapsed,
                status.is_open,
                status.has_balance,
                status.has_players
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        let request_id = raffle_data.next_request_id;
        raffle_data.next_request_id = raffle_data
            .next_request_id
            .checked_add(1)
            .ok_or(ProgramError::InvalidArgument)?;
        raffle_data.pending_request_id = Some(request_id);
        raffle_data.state = RaffleState::Selecting;
        Raffle::pack(raffle_data.clone(), &mut raffle_info.data.borrow_mut())?;

        msg!(
            "SelectionRequested: request_id={} gas_lane={:?} subscription_id={} callback_gas_limit={} num_words=1",
            request_id,
            raffle_data.gas_lane,
            raffle_data.subscription_id,
            raffle_data.callback_gas_limit
        );
        Ok(())
    }

    /// Complete the round from a randomness response. Only the
    /// configured oracle authority may deliver; the response must match
    /// the outstanding request id. The round reset is committed only
    /// after the pot transfer succeeds; any failure aborts the whole
    /// instruction and the round stays in selecting with the pot intact.
    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        randomness: [u8; 32],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !oracle_authority_info.is_signer {
            msg!("Oracle authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;

        if raffle_data.oracle_authority != *oracle_authority_info.key {
            msg!("Signer is not the configured oracle authority");
            return Err(RaffleError::OracleAuthorityMismatch.into());
        }

        if raffle_data.pending_request_id != Some(request_id) {
            msg!(
                "Response for request {} does not match outstanding request {:?}",
                request_id,
                raffle_data.pending_request_id
            );
            return Err(RaffleError::UnknownRequest.into());
        }

        if raffle_data.players.is_empty() {
            msg!("No entrants recorded for the selecting round");
            return Err(RaffleError::NoEligibleEntrants.into());
        }

        let index = utils::winner_index(&randomness, raffle_data.players.len() as u64);
        let winner = raffle_data.players[index as usize];
        msg!("Selected entrant index {} of {}", index, raffle_data.players.len());

        if *winner_info.key != winner {
            msg!("Expected winner account {}, got {}", winner, winner_info.key);
            return Err(RaffleError::WinnerAccountMismatch.into());
        }

        utils::transfer_pot(raffle_info, winner_info, raffle_data.pot_lamports)?;

        let clock = Clock::get()?;
        raffle_data.players.clear();
        raffle_data.state = RaffleState::Open;
        raffle_data.last_timestamp = clock.unix_timestamp;
        raffle_data.pending_request_id = None;
        raffle_data.recent_winner = winner;
        raffle_data.pot_lamports = 0;
        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        msg!("WinnerPicked: winner={}", winner);
        Ok(())
    }
}
